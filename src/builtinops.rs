//! Built-in operations registry: the primitive function table and the special forms.
//!
//! ## Functions vs Special Forms
//!
//! - **Functions**: receive evaluated arguments (e.g. `+`, `array`, `get`). They are
//!   installed into the global environment by [`crate::evaluator::create_global_env`]
//!   and can be shadowed, passed around and stored like any other value.
//! - **Special Forms**: receive their operands unevaluated together with the acting
//!   scopes (`quote`, `do`, `fn`, `if`, `define`, `define-syntax`). They are
//!   recognized by the literal head symbol of a form and never live in an environment.
//!
//! ## Semantics of the primitive table
//!
//! The primitives follow a dynamically typed host rather than a strict numeric tower:
//!
//! - **IEEE arithmetic**: `(/ 1 0)` is `Infinity`, nothing overflows or traps
//! - **Left folds**: `(- 10 3 2)` is `5`, a single operand is returned unchanged
//! - **Chained equality**: `(= 5 5 5)` is `true`. Every adjacent pair is compared;
//!   the boolean result of one comparison is never fed into the next
//! - **Only literal false is falsy**: `(not 0)` is `false`
//! - **Lenient lookup**: `get` answers `undefined` for anything it cannot find
//!
//! Type mismatches that have no sensible answer (adding a string to a number,
//! ordering a number against a string) are reported as `TypeError`.

use crate::Error;
use crate::ast::{NumberType, Value, format_number};
use crate::evaluator::intooperation::{
    IntoOperation, IntoVariadicOperation, NumIter, OperationFn, ValueIter,
};
use crate::evaluator::{
    Environment, MacroTable, eval_define, eval_define_syntax, eval_do, eval_fn, eval_if,
    eval_quote,
};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, LazyLock};

/// Number of operands accepted by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive bounds
    Range(usize, usize),
    Any,
}

impl Arity {
    /// Check `arg_count` against this arity, reporting the nearest bound on failure
    pub fn validate(&self, arg_count: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(n) if arg_count != n => Err(Error::arity_error(n, arg_count)),
            Arity::AtLeast(min) if arg_count < min => Err(Error::arity_error(min, arg_count)),
            Arity::Range(min, _) if arg_count < min => Err(Error::arity_error(min, arg_count)),
            Arity::Range(_, max) if arg_count > max => Err(Error::arity_error(max, arg_count)),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(min) => write!(f, "at least {min}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Signature shared by all special forms: unevaluated operands (head excluded)
/// plus the acting environment and macro table.
pub type SpecialFormFn = fn(&[Value], &Environment, &MacroTable) -> Result<Value, Error>;

/// Represents the implementation of a built-in expression (function or special form)
#[derive(Clone)]
pub enum OpKind {
    /// Regular function that takes evaluated arguments and returns a value
    /// via the canonical erased native signature.
    Function(Arc<OperationFn>),
    /// Special form that controls the evaluation of its own operands
    SpecialForm(SpecialFormFn),
}

impl fmt::Debug for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The symbol this operation is known by
    pub id: &'static str,
    pub op_kind: OpKind,
    /// Expected number of operands
    pub arity: Arity,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BuiltinOp {
    pub fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }

    pub(crate) fn validate_arity(&self, arg_count: usize) -> Result<(), Error> {
        self.arity.validate(arg_count)
    }
}

//
// Builtin Function Implementations
//

// Left folds over numeric operands; a lone operand passes through unchanged.
macro_rules! numeric_fold {
    ($name:ident, $op:tt) => {
        fn $name(first: NumberType, rest: NumIter<'_>) -> NumberType {
            rest.fold(first, |acc, n| acc $op n)
        }
    };
}

numeric_fold!(builtin_add, +);
numeric_fold!(builtin_sub, -);
numeric_fold!(builtin_mul, *);
numeric_fold!(builtin_div, /);

// Binary ordering over two numbers or two strings (lexicographic).
macro_rules! ordering_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(left: Value, right: Value) -> Result<bool, Error> {
            match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(a $op b),
                (Value::String(a), Value::String(b)) => Ok(a $op b),
                _ => Err(Error::TypeError(format!(
                    concat!("'", $op_str, "' cannot compare {} with {}"),
                    left.type_name(),
                    right.type_name()
                ))),
            }
        }
    };
}

ordering_comparison!(builtin_gt, >, ">");
ordering_comparison!(builtin_lt, <, "<");
ordering_comparison!(builtin_ge, >=, ">=");
ordering_comparison!(builtin_le, <=, "<=");

/// True when every adjacent pair of operands is equal, so `(= 5 5 5)` holds
/// while `(= 5 5 true)` does not
fn builtin_eq(first: Value, rest: ValueIter<'_>) -> bool {
    let mut prev = &first;
    for current in rest {
        if prev != current {
            return false;
        }
        prev = current;
    }
    true
}

fn builtin_not(value: Value) -> bool {
    matches!(value, Value::Bool(false))
}

fn builtin_print(args: ValueIter<'_>) -> Result<Value, Error> {
    write_line(&mut io::stdout().lock(), args)?;
    Ok(Value::Undefined)
}

/// Write values separated by spaces, strings unquoted. A closed reader is
/// not an error.
fn write_line(out: &mut impl Write, args: ValueIter<'_>) -> Result<(), Error> {
    let parts: Vec<String> = args
        .map(|value| match value {
            Value::String(s) => s.clone(),
            _ => value.to_string(),
        })
        .collect();

    match writeln!(out, "{}", parts.join(" ")) {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(Error::Io(e.to_string())),
        _ => Ok(()),
    }
}

fn builtin_array(args: ValueIter<'_>) -> Value {
    Value::List(args.cloned().collect())
}

fn builtin_append(args: ValueIter<'_>) -> Value {
    let mut result = Vec::new();
    for arg in args {
        match arg {
            Value::List(items) => result.extend(items.iter().cloned()),
            other => result.push(other.clone()),
        }
    }
    Value::List(result)
}

/// Resolve a slice start against a collection of `len` elements: truncated
/// toward zero, negative counts back from the end, clamped to `0..=len`.
fn slice_start(start: NumberType, len: usize) -> usize {
    let start = if start.is_nan() { 0.0 } else { start.trunc() };
    let len = len as NumberType;
    if start < 0.0 {
        (len + start).max(0.0) as usize
    } else {
        start.min(len) as usize
    }
}

fn builtin_slice(collection: Value, start: NumberType) -> Result<Value, Error> {
    match collection {
        Value::List(items) => {
            let from = slice_start(start, items.len());
            Ok(Value::List(items[from..].to_vec()))
        }
        Value::String(s) => {
            let from = slice_start(start, s.chars().count());
            Ok(Value::String(s.chars().skip(from).collect()))
        }
        other => Err(Error::TypeError(format!(
            "slice expects a sequence or string, got {}",
            other.type_name()
        ))),
    }
}

/// Keys are compared in their textual form, so `1` and `"1"` address the same slot.
fn property_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => format_number(*n),
        other => other.to_string(),
    }
}

/// Parse a canonical non-negative index ("0", "12"; not "01" or "1.5")
fn parse_index(key: &str) -> Option<usize> {
    let index: usize = key.parse().ok()?;
    (index.to_string() == key).then_some(index)
}

fn builtin_get(collection: Value, key: Value) -> Result<Value, Error> {
    let key = property_key(&key);
    let found = match &collection {
        Value::Undefined => {
            return Err(Error::TypeError(format!(
                "cannot read {key:?} of undefined"
            )));
        }
        Value::List(items) if key == "length" => Some(Value::from(items.len())),
        Value::List(items) => parse_index(&key).and_then(|i| items.get(i).cloned()),
        Value::String(s) if key == "length" => Some(Value::from(s.chars().count())),
        Value::String(s) => parse_index(&key)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string())),
        Value::Environment(env) => env.get(&key),
        Value::MacroTable(menv) => menv.get(&key).map(Value::Macro),
        _ => None,
    };
    Ok(found.unwrap_or(Value::Undefined))
}

/// Global registry of all built-in operations.
///
/// The natives are wired through the same adapter layer used for custom
/// registration, once, at first use.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    fn builtin_fixed<Args, F>(f: F) -> Arc<OperationFn>
    where
        F: IntoOperation<Args>,
    {
        <F as IntoOperation<Args>>::into_operation(f)
    }

    fn builtin_variadic<Args, F>(f: F) -> Arc<OperationFn>
    where
        F: IntoVariadicOperation<Args>,
    {
        <F as IntoVariadicOperation<Args>>::into_variadic_operation(f)
    }

    vec![
        // Special forms
        BuiltinOp {
            id: "quote",
            op_kind: OpKind::SpecialForm(eval_quote),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "do",
            op_kind: OpKind::SpecialForm(eval_do),
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "fn",
            op_kind: OpKind::SpecialForm(eval_fn),
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "if",
            op_kind: OpKind::SpecialForm(eval_if),
            arity: Arity::Range(2, 3),
        },
        BuiltinOp {
            id: "define",
            op_kind: OpKind::SpecialForm(eval_define),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "define-syntax",
            op_kind: OpKind::SpecialForm(eval_define_syntax),
            arity: Arity::Exact(2),
        },
        // Arithmetic
        BuiltinOp {
            id: "+",
            op_kind: OpKind::Function(builtin_variadic::<(NumberType, NumIter<'static>), _>(
                builtin_add,
            )),
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "-",
            op_kind: OpKind::Function(builtin_variadic::<(NumberType, NumIter<'static>), _>(
                builtin_sub,
            )),
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "*",
            op_kind: OpKind::Function(builtin_variadic::<(NumberType, NumIter<'static>), _>(
                builtin_mul,
            )),
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "/",
            op_kind: OpKind::Function(builtin_variadic::<(NumberType, NumIter<'static>), _>(
                builtin_div,
            )),
            arity: Arity::AtLeast(1),
        },
        // Comparison
        BuiltinOp {
            id: "=",
            op_kind: OpKind::Function(builtin_variadic::<(Value, ValueIter<'static>), _>(
                builtin_eq,
            )),
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: ">",
            op_kind: OpKind::Function(builtin_fixed::<(Value, Value), _>(builtin_gt)),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "<",
            op_kind: OpKind::Function(builtin_fixed::<(Value, Value), _>(builtin_lt)),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: ">=",
            op_kind: OpKind::Function(builtin_fixed::<(Value, Value), _>(builtin_ge)),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "<=",
            op_kind: OpKind::Function(builtin_fixed::<(Value, Value), _>(builtin_le)),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "not",
            op_kind: OpKind::Function(builtin_fixed::<(Value,), _>(builtin_not)),
            arity: Arity::Exact(1),
        },
        // Output
        BuiltinOp {
            id: "print",
            op_kind: OpKind::Function(builtin_variadic::<(ValueIter<'static>,), _>(
                builtin_print,
            )),
            arity: Arity::Any,
        },
        // Sequences
        BuiltinOp {
            id: "array",
            op_kind: OpKind::Function(builtin_variadic::<(ValueIter<'static>,), _>(
                builtin_array,
            )),
            arity: Arity::Any,
        },
        BuiltinOp {
            id: "append",
            op_kind: OpKind::Function(builtin_variadic::<(ValueIter<'static>,), _>(
                builtin_append,
            )),
            arity: Arity::Any,
        },
        BuiltinOp {
            id: "slice",
            op_kind: OpKind::Function(builtin_fixed::<(Value, NumberType), _>(builtin_slice)),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "get",
            op_kind: OpKind::Function(builtin_fixed::<(Value, Value), _>(builtin_get)),
            arity: Arity::Exact(2),
        },
    ]
});

/// Lazy static map from id to BuiltinOp (private - use find_builtin_op)
static BUILTIN_BY_ID: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.id, op)).collect()
});

/// All builtin operations, special forms included
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by its identifier
pub fn find_builtin_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_BY_ID.get(id).copied()
}

/// Find a special form by its identifier; plain functions are not returned
pub fn find_special_form(id: &str) -> Option<&'static BuiltinOp> {
    find_builtin_op(id).filter(|op| op.is_special_form())
}
