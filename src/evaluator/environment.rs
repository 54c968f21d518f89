use crate::Error;
use crate::ast::{Macro, Value};
use crate::builtinops::Arity;
use crate::evaluator::intooperation::{IntoOperation, IntoVariadicOperation, OperationFn};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// A mutable handle on a persistent name → value map.
///
/// Cloning a `Scope` clones the handle: both clones observe each other's
/// `define`s. [`Scope::snapshot`] instead produces a detached scope that
/// starts with the same bindings; the underlying `im::HashMap` shares its
/// structure, so snapshots are cheap regardless of scope size.
pub struct Scope<V: Clone> {
    bindings: Rc<RefCell<im::HashMap<String, V>>>,
}

/// Variable bindings
pub type Environment = Scope<Value>;

/// Macro transformers registered by `define-syntax`
pub type MacroTable = Scope<Macro>;

impl<V: Clone> Scope<V> {
    pub fn new() -> Self {
        Scope {
            bindings: Rc::new(RefCell::new(im::HashMap::new())),
        }
    }

    /// Bind or overwrite `name` in this scope
    pub fn define(&self, name: impl Into<String>, value: V) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<V> {
        self.bindings.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// A detached copy: later `define`s on either side are invisible to the other
    pub fn snapshot(&self) -> Self {
        Scope {
            bindings: Rc::new(RefCell::new(self.bindings.borrow().clone())),
        }
    }

    /// All bound names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// All bindings as (name, value) pairs sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, V)> {
        let mut result: Vec<(String, V)> = self
            .bindings
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    /// True when both handles refer to the same scope
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.bindings, &other.bindings)
    }
}

impl<V: Clone> Clone for Scope<V> {
    fn clone(&self) -> Self {
        Scope {
            bindings: Rc::clone(&self.bindings),
        }
    }
}

impl<V: Clone> Default for Scope<V> {
    fn default() -> Self {
        Self::new()
    }
}

// Values may contain closures that hold this very scope, so only names are printed.
impl<V: Clone> fmt::Debug for Scope<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("names", &self.names())
            .finish()
    }
}

impl Scope<Value> {
    /// Register a native function in the environment.
    ///
    /// This is the low-level API: the function works on `&[Value]` directly.
    ///
    /// # Example
    /// ```
    /// use jsonlisp::{Error, Interpreter, Value};
    ///
    /// fn count_args(args: &[Value]) -> Result<Value, Error> {
    ///     Ok(Value::from(args.len()))
    /// }
    ///
    /// let interpreter = Interpreter::new();
    /// interpreter.env().register_builtin_function("count-args", count_args);
    /// let form = jsonlisp::parse_json(r#"["count-args", 1, 2, 3]"#).unwrap();
    /// assert_eq!(interpreter.evaluate(&form).unwrap(), Value::from(3));
    /// ```
    pub fn register_builtin_function(&self, name: &str, func: fn(&[Value]) -> Result<Value, Error>) {
        let wrapped: Arc<OperationFn> = Arc::new(move |args: Vec<Value>| func(&args));
        self.define(
            name,
            Value::NativeFunction {
                id: name.to_owned(),
                func: wrapped,
            },
        );
    }

    /// Register a strongly-typed Rust function as a native with automatic
    /// argument extraction and result conversion.
    ///
    /// ```rust,ignore
    /// fn hypot(a: f64, b: f64) -> f64 { (a * a + b * b).sqrt() }
    /// env.register_builtin_operation::<_, (f64, f64)>("hypot", hypot);
    /// ```
    ///
    /// Supported parameter types: `f64`, `bool`, `&str`, `Value`, and
    /// `ValueIter<'_>` / `NumIter<'_>` for a sequence argument. Supported
    /// return types: anything `Into<Value>`, or `Result<R, Error>` of one.
    ///
    /// Arity is enforced exactly; conversion failures yield `TypeError`.
    pub fn register_builtin_operation<F, Args>(&self, name: &str, func: F)
    where
        F: IntoOperation<Args> + 'static,
    {
        self.define(
            name,
            Value::NativeFunction {
                id: name.to_owned(),
                func: func.into_operation(),
            },
        );
    }

    /// Register a native whose last Rust parameter is a rest iterator
    /// (`ValueIter<'_>` or `NumIter<'_>`), optionally after a fixed prefix.
    ///
    /// The provided [`Arity`] is checked on every call, since the minimum and
    /// maximum argument counts of a variadic native are not derivable from
    /// its signature.
    pub fn register_variadic_builtin_operation<F, Args>(&self, name: &str, arity: Arity, func: F)
    where
        F: IntoVariadicOperation<Args> + 'static,
    {
        let inner = func.into_variadic_operation();
        let wrapped: Arc<OperationFn> = Arc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            inner(args)
        });

        self.define(
            name,
            Value::NativeFunction {
                id: name.to_owned(),
                func: wrapped,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::val;

    #[test]
    fn test_clone_shares_and_snapshot_detaches() {
        let env = Environment::new();
        env.define("x", val(1));

        let alias = env.clone();
        let snapshot = env.snapshot();

        alias.define("x", val(2));
        snapshot.define("y", val(3));

        assert_eq!(env.get("x"), Some(val(2)));
        assert_eq!(snapshot.get("x"), Some(val(1)));
        assert_eq!(env.get("y"), None);
        assert!(env.ptr_eq(&alias));
        assert!(!env.ptr_eq(&snapshot));
    }

    #[test]
    fn test_names_are_sorted() {
        let env = Environment::new();
        for name in ["zeta", "alpha", "mu"] {
            env.define(name, Value::Undefined);
        }
        assert_eq!(env.names(), vec!["alpha", "mu", "zeta"]);
        assert_eq!(env.len(), 3);
        assert!(env.contains("mu"));
        assert!(!MacroTable::new().contains("mu"));
        assert!(MacroTable::new().is_empty());
    }

    #[test]
    fn test_get_all_bindings() {
        let env = Environment::new();
        env.define("b", val(2));
        env.define("a", val(1));
        assert_eq!(
            env.get_all_bindings(),
            vec![("a".to_owned(), val(1)), ("b".to_owned(), val(2))]
        );
    }
}
