//! Bundled macros, written in the language itself.
//!
//! - `let`: `["let", [n1, v1, n2, v2, ...], body...]` binds each name in turn
//!   through a nested one-parameter function. With no bindings left the body
//!   runs inside a nullary function, so `define` in the body stays local.
//! - `->`: `["->", x, [f, a...], rest...]` threads `x` in as the first argument
//!   of each step: `["->", 5, ["-", 1], ["*", 10]]` is `["*", ["-", 5, 1], 10]`.

use crate::Error;
use crate::ast::Value;
use crate::evaluator::{Environment, MacroTable, eval};
use crate::json::parse_json;
use tracing::debug;

const PRELUDE_SOURCE: &str = include_str!("prelude.json");

/// The prelude's top-level forms
pub fn forms() -> Result<Vec<Value>, Error> {
    match parse_json(PRELUDE_SOURCE)? {
        Value::List(forms) => Ok(forms),
        other => Err(Error::ParseError(format!(
            "prelude must be a sequence of forms, got {}",
            other.type_name()
        ))),
    }
}

/// Evaluate the prelude into the given scopes
pub fn install(env: &Environment, menv: &MacroTable) -> Result<(), Error> {
    for form in forms()? {
        eval(&form, env, menv)?;
    }
    debug!(macros = ?menv.names(), "prelude installed");
    Ok(())
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;
    use crate::evaluator::Interpreter;

    fn run(interpreter: &Interpreter, input: &str) -> Result<Value, Error> {
        interpreter.evaluate(&parse_json(input).unwrap())
    }

    fn interpreter_with_prelude() -> Interpreter {
        let mut interpreter = Interpreter::new();
        interpreter.load_prelude().unwrap();
        interpreter
    }

    #[test]
    fn test_install_defines_macros() {
        let interpreter = interpreter_with_prelude();
        assert_eq!(interpreter.macros().names(), vec!["->", "let"]);
    }

    #[test]
    fn test_let() {
        let interpreter = interpreter_with_prelude();
        // (input, expected)
        let test_cases = vec![
            (r#"["let", [], 12]"#, val(12)),
            (r#"["let", [], ["define", "nested", 12], "nested"]"#, val(12)),
            (r#"["let", ["x", 12], ["+", 1, "x"]]"#, val(13)),
            (r#"["let", ["x", 12, "y", 10], ["*", "y", "x"]]"#, val(120)),
            // Later bindings see earlier ones
            (r#"["let", ["x", 2, "y", ["*", "x", 10]], "y"]"#, val(20)),
            (r#"["let", ["x", 1], ["let", ["x", 2], "x"]]"#, val(2)),
        ];
        for (input, expected) in test_cases {
            assert_eq!(run(&interpreter, input).unwrap(), expected, "{input}");
        }

        // A body-local define does not leak out
        assert!(matches!(
            run(&interpreter, "\"nested\""),
            Err(Error::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_threading() {
        let interpreter = interpreter_with_prelude();
        let test_cases = vec![
            (r#"["->", 5]"#, val(5)),
            (r#"["->", 5, ["-", 1, 1, 1], ["*", 10]]"#, val(20)),
            (r#"["->", 10, ["*", 9], ["/", 5], ["+", 32]]"#, val(50)),
            (r#"["->", ["array", 1, 2], ["get", 1]]"#, val(2)),
        ];
        for (input, expected) in test_cases {
            assert_eq!(run(&interpreter, input).unwrap(), expected, "{input}");
        }
    }

    #[test]
    fn test_reset_reinstalls_prelude() {
        let mut interpreter = interpreter_with_prelude();
        run(&interpreter, r#"["define-syntax", "m", ["fn", ["x", "e", "me"], 1]]"#).unwrap();
        interpreter.reset().unwrap();
        assert_eq!(interpreter.macros().names(), vec!["->", "let"]);
    }
}
