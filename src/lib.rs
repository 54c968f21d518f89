//! jsonlisp - a minimal homoiconic Lisp whose programs are plain data
//!
//! Programs are nested values: numbers, strings, booleans and sequences. A
//! sequence is both the syntax tree node and the runtime list, and a string
//! doubles as a symbol whenever it is evaluated. There is no textual syntax of
//! our own; programs usually arrive as JSON:
//!
//! ```json
//! ["do",
//!   ["define", "square", ["fn", ["x"], ["*", "x", "x"]]],
//!   ["square", 12]]
//! ```
//!
//! Before every evaluation step a form is expanded with the user-defined
//! macros registered through `define-syntax`. Macro transformers are ordinary
//! closures of three parameters (the raw form, the acting environment and the
//! acting macro table) and return replacement syntax.
//!
//! ## Deep recursion
//!
//! Interpreted calls map directly onto native recursion and there is no
//! tail-call elimination. Deeply recursive programs can exhaust the native
//! stack; embedders who need more depth should run evaluation on a thread
//! with a larger stack (the `jsonlisp` binary has `--stack-size` for this).
//!
//! ## Modules
//!
//! - `ast`: the value model
//! - `expander`: shallow and deep macro expansion
//! - `evaluator`: special forms, application, scopes and the `Interpreter` context
//! - `builtinops`: the primitive function table and the special form registry
//! - `json`: conversion between JSON documents and values
//! - `prelude`: the bundled `let` and `->` macros

use thiserror::Error;

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Symbol lookup failed; `bound` lists every name visible at the failure site
    #[error("undefined: {name:?} (have {})", .bound.join(","))]
    UndefinedVariable { name: String, bound: Vec<String> },
    /// Empty application or a structurally malformed special form
    #[error("illegal function call: {0}")]
    IllegalCall(String),
    /// The evaluated head of an application cannot be invoked
    #[error("cannot call non-function {0}")]
    NotAFunction(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("ArityError: function expected {expected} arguments but got {got}")]
    ArityError { expected: usize, got: usize },
    #[error("ParseError: {0}")]
    ParseError(String),
    /// Writing program output failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError { expected, got }
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod expander;
pub mod json;
pub mod prelude;

pub use ast::Value;
pub use evaluator::{Environment, Interpreter, MacroTable, create_global_env, eval};
pub use json::{parse_json, to_json};
