use crate::Error;
use crate::ast::{Closure, Macro, Value};
use crate::builtinops::{OpKind, find_special_form, get_builtin_ops};
use crate::expander::expand;
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

pub mod environment;
pub mod intooperation;

pub use crate::builtinops::Arity;
pub use environment::{Environment, MacroTable, Scope};
pub use intooperation::{NumIter, ValueIter};

/// Evaluate a form in explicit scopes (public API)
///
/// The form is fully macro-expanded first, then dispatched on its shape:
/// strings are variable references, sequences are special forms or
/// applications, and everything else evaluates to itself.
pub fn eval(form: &Value, env: &Environment, menv: &MacroTable) -> Result<Value, Error> {
    let form = expand(form, env, menv)?;
    match form.as_ref() {
        Value::String(name) => env.get(name).ok_or_else(|| Error::UndefinedVariable {
            name: name.clone(),
            bound: env.names(),
        }),
        Value::List(elements) => eval_list(elements, env, menv),
        _ => Ok(form.into_owned()),
    }
}

/// Evaluate a list expression: special form dispatch or function application
fn eval_list(elements: &[Value], env: &Environment, menv: &MacroTable) -> Result<Value, Error> {
    let Some((head, operands)) = elements.split_first() else {
        return Err(Error::IllegalCall("[]".to_owned()));
    };

    if let Some(name) = head.as_symbol()
        && let Some(op) = find_special_form(name)
        && let OpKind::SpecialForm(special_form) = &op.op_kind
    {
        if op.validate_arity(operands.len()).is_err() {
            return Err(Error::IllegalCall(format!(
                "{}: {name} takes {} operands, got {}",
                Value::List(elements.to_vec()),
                op.arity,
                operands.len()
            )));
        }
        return special_form(operands, env, menv);
    }

    // Application: head first, then every argument, left to right
    let callee = eval(head, env, menv)?;
    let args = operands
        .iter()
        .map(|arg| eval(arg, env, menv))
        .collect::<Result<Vec<_>, _>>()?;

    match &callee {
        Value::NativeFunction { .. } | Value::Closure(_) => apply(&callee, args),
        _ => Err(Error::NotAFunction(head.to_string())),
    }
}

/// Invoke a callable value with already evaluated arguments
pub fn apply(func: &Value, args: Vec<Value>) -> Result<Value, Error> {
    match func {
        Value::NativeFunction { func, .. } => func(args),
        Value::Closure(closure) => closure.invoke(args),
        other => Err(Error::NotAFunction(other.to_string())),
    }
}

impl Closure {
    /// Run the body in a fresh copy of the captured environment.
    ///
    /// Parameters are bound positionally: surplus arguments are dropped and
    /// missing ones are bound to `undefined`. The body forms run in order as
    /// an implicit `do`, bypassing the macro table, so a user macro named `do`
    /// only affects `do` forms written in code.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, Error> {
        let frame = self.env.snapshot();
        let mut args = args.into_iter();
        for param in &self.params {
            frame.define(param.as_str(), args.next().unwrap_or(Value::Undefined));
        }

        eval_do(&self.body, &frame, &self.menv)
    }
}

/// Malformed special form
fn illegal(form: &str, operands: &[Value], reason: &str) -> Error {
    let mut elements = Vec::with_capacity(operands.len() + 1);
    elements.push(Value::from(form));
    elements.extend_from_slice(operands);
    Error::IllegalCall(format!("{}: {reason}", Value::List(elements)))
}

/// Extract the symbol naming a binding
fn binding_name<'a>(form: &str, operands: &'a [Value]) -> Result<&'a str, Error> {
    operands
        .first()
        .and_then(Value::as_symbol)
        .ok_or_else(|| illegal(form, operands, "name must be a symbol"))
}

/// Evaluate quote special form
pub(crate) fn eval_quote(
    operands: &[Value],
    _env: &Environment,
    _menv: &MacroTable,
) -> Result<Value, Error> {
    match operands {
        [payload] => Ok(payload.clone()),
        _ => Err(illegal("quote", operands, "expected one operand")),
    }
}

/// Evaluate do special form
pub(crate) fn eval_do(
    operands: &[Value],
    env: &Environment,
    menv: &MacroTable,
) -> Result<Value, Error> {
    let Some((last, init)) = operands.split_last() else {
        return Err(illegal("do", operands, "empty body"));
    };
    for form in init {
        eval(form, env, menv)?;
    }
    eval(last, env, menv)
}

/// Evaluate fn special form
pub(crate) fn eval_fn(
    operands: &[Value],
    env: &Environment,
    menv: &MacroTable,
) -> Result<Value, Error> {
    let [Value::List(param_list), body @ ..] = operands else {
        return Err(illegal("fn", operands, "parameters must be a sequence"));
    };
    if body.is_empty() {
        return Err(illegal("fn", operands, "empty body"));
    }

    let params = param_list
        .iter()
        .map(|param| {
            param
                .as_symbol()
                .map(str::to_owned)
                .ok_or_else(|| illegal("fn", operands, "parameters must be symbols"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::Closure(Rc::new(Closure {
        params,
        body: body.to_vec(),
        env: env.clone(),
        menv: menv.clone(),
    })))
}

/// Evaluate if special form
pub(crate) fn eval_if(
    operands: &[Value],
    env: &Environment,
    menv: &MacroTable,
) -> Result<Value, Error> {
    match operands {
        [condition, then_form, rest @ ..] => {
            if eval(condition, env, menv)?.is_truthy() {
                eval(then_form, env, menv)
            } else if let Some(else_form) = rest.first() {
                eval(else_form, env, menv)
            } else {
                Ok(Value::Undefined)
            }
        }
        _ => Err(illegal("if", operands, "expected a condition and a branch")),
    }
}

/// Evaluate define special form
pub(crate) fn eval_define(
    operands: &[Value],
    env: &Environment,
    menv: &MacroTable,
) -> Result<Value, Error> {
    let name = binding_name("define", operands)?;
    let [_, value_form] = operands else {
        return Err(illegal("define", operands, "expected a name and a value"));
    };

    let value = eval(value_form, env, menv)?;
    debug!(name, value = %value, "define");
    env.define(name, value);
    Ok(Value::Undefined)
}

/// Evaluate define-syntax special form
pub(crate) fn eval_define_syntax(
    operands: &[Value],
    env: &Environment,
    menv: &MacroTable,
) -> Result<Value, Error> {
    let name = binding_name("define-syntax", operands)?;
    let [_, transformer_form] = operands else {
        return Err(illegal(
            "define-syntax",
            operands,
            "expected a name and a transformer",
        ));
    };

    match eval(transformer_form, env, menv)? {
        Value::Closure(closure) if closure.params.len() == 3 => {
            debug!(name, "define-syntax");
            menv.define(name, Macro(closure));
            Ok(Value::Undefined)
        }
        other => Err(illegal(
            "define-syntax",
            operands,
            &format!(
                "transformer must be a function of (form env menv), got {other}"
            ),
        )),
    }
}

/// Create a global environment with the primitive functions
pub fn create_global_env() -> Environment {
    let env = Environment::new();

    for builtin_op in get_builtin_ops() {
        if let OpKind::Function(func) = &builtin_op.op_kind {
            let func = Arc::clone(func);
            let arity = builtin_op.arity;
            env.define(
                builtin_op.id,
                Value::NativeFunction {
                    id: builtin_op.id.to_owned(),
                    func: Arc::new(move |args: Vec<Value>| {
                        arity.validate(args.len())?;
                        func(args)
                    }),
                },
            );
        }
    }

    env
}

/// Evaluation context owning the top-level environment and macro table.
///
/// Top-level `define` and `define-syntax` forms mutate these scopes and stay
/// visible to every later evaluation until [`Interpreter::reset`].
#[derive(Debug)]
pub struct Interpreter {
    env: Environment,
    menv: MacroTable,
    with_primitives: bool,
    with_prelude: bool,
}

impl Interpreter {
    /// Context with the primitive functions installed
    pub fn new() -> Self {
        Interpreter {
            env: create_global_env(),
            menv: MacroTable::new(),
            with_primitives: true,
            with_prelude: false,
        }
    }

    /// Context with no bindings at all
    pub fn empty() -> Self {
        Interpreter {
            env: Environment::new(),
            menv: MacroTable::new(),
            with_primitives: false,
            with_prelude: false,
        }
    }

    /// Context over caller-provided scopes; `reset` falls back to the primitives
    pub fn with_scopes(env: Environment, menv: MacroTable) -> Self {
        Interpreter {
            env,
            menv,
            with_primitives: true,
            with_prelude: false,
        }
    }

    pub fn evaluate(&self, form: &Value) -> Result<Value, Error> {
        eval(form, &self.env, &self.menv)
    }

    /// Evaluate forms in order and return the last value (`undefined` for none).
    /// Stops at the first error.
    pub fn evaluate_all(&self, forms: &[Value]) -> Result<Value, Error> {
        let mut last = Value::Undefined;
        for form in forms {
            last = self.evaluate(form)?;
        }
        Ok(last)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn macros(&self) -> &MacroTable {
        &self.menv
    }

    /// Install the bundled `let` and `->` macros
    pub fn load_prelude(&mut self) -> Result<(), Error> {
        crate::prelude::install(&self.env, &self.menv)?;
        self.with_prelude = true;
        Ok(())
    }

    /// Drop every user definition and restore the initial state, including
    /// the prelude if it had been loaded.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.env = if self.with_primitives {
            create_global_env()
        } else {
            Environment::new()
        };
        self.menv = MacroTable::new();
        if self.with_prelude {
            crate::prelude::install(&self.env, &self.menv)?;
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
