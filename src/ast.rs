//! This module defines the value model shared by programs and data. The main enum,
//! [`Value`], covers numbers, strings (which double as symbols when evaluated),
//! booleans, `undefined`, sequences, native functions, closures, macros and the two
//! scope handles passed to macro transformers. A sequence is both a syntax tree node
//! and a runtime list, so there is no separate AST type.
//!
//! Ergonomic helpers [`val`] and [`nil`] and conversion traits for common Rust types
//! make it easy to build values from literals, arrays, slices and vectors.

use crate::Error;
use crate::evaluator::intooperation::OperationFn;
use crate::evaluator::{Environment, MacroTable};
use std::rc::Rc;
use std::sync::Arc;

/// Type alias for number values in the interpreter
pub type NumberType = f64;

/// Core value type of the interpreter
///
/// To build a form, use the helper functions:
/// - `val(42)` for values, `val("name")` for symbols and strings, `nil()` for empty sequences
/// - `val([1, 2, 3])` for homogeneous sequences
/// - `val(vec![val("op"), val(42)])` for mixed sequences
#[derive(Clone)]
pub enum Value {
    /// IEEE double precision numbers
    Number(NumberType),
    /// Atomic text; evaluates as a variable reference
    String(String),
    Bool(bool),
    /// Result of `define`, `print`, missing arguments and missing lookups
    Undefined,
    /// Ordered sequence, used both as a form and as a runtime list
    List(Vec<Value>),
    /// Host-provided function; compared by id, not by function pointer
    NativeFunction {
        id: String,
        func: Arc<OperationFn>,
    },
    /// User-defined function created by `fn`
    Closure(Rc<Closure>),
    /// Transformer registered by `define-syntax`
    Macro(Macro),
    /// Environment handle, as received by macro transformers
    Environment(Environment),
    /// Macro table handle, as received by macro transformers
    MacroTable(MacroTable),
}

/// A function value created by `fn`.
///
/// `env` and `menv` are handles on the scopes the closure was created in.
/// Every invocation starts from a copy of `env`, so bindings made inside the
/// body never leak back into it.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Vec<Value>,
    pub env: Environment,
    pub menv: MacroTable,
}

/// A macro transformer: a closure of exactly three parameters
/// (form, environment, macro table) that rewrites syntax.
#[derive(Clone)]
pub struct Macro(pub(crate) Rc<Closure>);

impl Macro {
    pub fn closure(&self) -> &Closure {
        &self.0
    }
}

impl Value {
    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Undefined => "undefined",
            Value::List(_) => "sequence",
            Value::NativeFunction { .. } => "native function",
            Value::Closure(_) => "function",
            Value::Macro(_) => "macro",
            Value::Environment(_) => "environment",
            Value::MacroTable(_) => "macro table",
        }
    }

    /// The symbol name, if this value is a string
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Only literal `false` is falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false))
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({})", format_number(*n)),
            Value::String(s) => write!(f, "String(\"{s}\")"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Undefined => write!(f, "Undefined"),
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::NativeFunction { id, .. } => write!(f, "NativeFunction({id})"),
            Value::Closure(closure) => write!(
                f,
                "Closure(params={:?}, body={:?})",
                closure.params, closure.body
            ),
            Value::Macro(m) => write!(f, "Macro(params={:?})", m.closure().params),
            Value::Environment(env) => write!(f, "Environment({} bindings)", env.len()),
            Value::MacroTable(menv) => write!(f, "MacroTable({} macros)", menv.len()),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NumberType> for Value {
    fn from(n: NumberType) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(n as NumberType)
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);
impl_from_integer!(usize);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(slice: &[T]) -> Self {
        Value::List(slice.iter().cloned().map(|x| x.into()).collect())
    }
}

// Fallible conversions from `Value` back into primitive Rust types.

impl TryFrom<Value> for NumberType {
    type Error = Error;

    fn try_from(value: Value) -> Result<NumberType, Error> {
        match value {
            Value::Number(n) => Ok(n),
            other => Err(Error::TypeError(format!(
                "expected number, got {}",
                other.type_name()
            ))),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<bool, Error> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(Error::TypeError(format!(
                "expected boolean, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Helper function for creating Values - works great in mixed lists!
/// Accepts any type that can be converted to Value
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating the empty sequence
pub fn nil() -> Value {
    Value::List(vec![])
}

/// Render a number the way a JavaScript host would: integral values without
/// a fractional part, `Infinity` and `NaN` spelled out.
pub(crate) fn format_number(n: NumberType) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Value::Bool(b) => write!(f, "{b}"),
            Value::Undefined => write!(f, "undefined"),
            Value::List(elements) => {
                write!(f, "[")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
            Value::NativeFunction { id, .. } => write!(f, "#<native-function:{id}>"),
            Value::Closure(closure) => write!(f, "#<fn [{}]>", closure.params.join(" ")),
            Value::Macro(m) => write!(f, "#<macro [{}]>", m.closure().params.join(" ")),
            Value::Environment(_) => write!(f, "#<environment>"),
            Value::MacroTable(_) => write!(f, "#<macro-table>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Undefined, Value::Undefined) => true,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::NativeFunction { id: id1, .. }, Value::NativeFunction { id: id2, .. }) => {
                // Compare natives by id string, not function pointer
                id1 == id2
            }
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Macro(a), Value::Macro(b)) => Rc::ptr_eq(&a.0, &b.0),
            (Value::Environment(a), Value::Environment(b)) => a.ptr_eq(b),
            (Value::MacroTable(a), Value::MacroTable(b)) => a.ptr_eq(b),
            _ => false, // Different variants are never equal
        }
    }
}
