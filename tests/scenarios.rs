//! End-to-end scenarios run in order against one interpreter session, so
//! definitions made by earlier steps are visible to later ones.

use jsonlisp::{Error, Interpreter, Value};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Expected outcome of one step
#[derive(Debug)]
enum Expect {
    /// Evaluation succeeds with this value (as JSON; `null` is `undefined`)
    Value(serde_json::Value),
    /// Evaluation fails with an error whose message contains this string
    SpecificError(&'static str),
}
use Expect::SpecificError;

fn value(json: serde_json::Value) -> Expect {
    Expect::Value(json)
}

fn to_value(json: serde_json::Value) -> Value {
    match Value::try_from(json) {
        Ok(value) => value,
        Err(err) => panic!("test form is not a valid program: {err}"),
    }
}

fn run_scenarios(interpreter: &Interpreter, steps: Vec<(&str, serde_json::Value, Expect)>) {
    for (name, form, expected) in steps {
        let result = interpreter.evaluate(&to_value(form.clone()));
        match (result, expected) {
            (Ok(actual), Expect::Value(expected)) => {
                assert_eq!(actual, to_value(expected), "step {name:?}: {form}");
            }
            (Err(err), SpecificError(fragment)) => {
                let message = err.to_string();
                assert!(
                    message.contains(fragment),
                    "step {name:?}: error {message:?} should contain {fragment:?}"
                );
            }
            (result, expected) => {
                panic!("step {name:?}: {form}\n  got {result:?}\n  expected {expected:?}")
            }
        }
    }
}

fn session() -> Interpreter {
    let mut interpreter = Interpreter::new();
    if let Err(err) = interpreter.load_prelude() {
        panic!("prelude failed to load: {err}");
    }
    interpreter
}

#[test]
fn test_language_tour() {
    let interpreter = session();
    run_scenarios(
        &interpreter,
        vec![
            ("quote", json!(["quote", 1]), value(json!(1))),
            ("quote symbol", json!(["quote", "QUOTED"]), value(json!("QUOTED"))),
            ("do", json!(["do", 1, 2, 3]), value(json!(3))),
            (
                "print",
                json!(["do",
                       ["print", ["quote", "Hello, and welcome to jsonlisp."]],
                       ["print", ["quote", "Let's run some tests"]]]),
                value(json!(null)),
            ),
            ("simple addition", json!(["+", 100, 23]), value(json!(123))),
            ("if", json!(["if", 100, 1, 2]), value(json!(1))),
            ("if zero is true", json!(["if", 0, 1, 2]), value(json!(1))),
            ("if false", json!(["if", false, 1, 2]), value(json!(2))),
            (
                "conditional evaluation",
                json!(["if", true,
                       ["print", ["quote", "i am executed"]],
                       ["print", ["quote", "i am not executed"]]]),
                value(json!(null)),
            ),
            (
                "if is an expression",
                json!(["print", ["if", true, ["quote", "yes"], ["quote", "no"]]]),
                value(json!(null)),
            ),
            (
                "anonymous function",
                json!([["fn", ["a", "b"],
                        ["print", ["quote", "anonymous fn called with a="], "a"],
                        ["print", ["quote", "anonymous fn called with b="], "b"],
                        ["*", "a", "b"]],
                       10, 2]),
                value(json!(20)),
            ),
            (
                "curried function",
                json!([[["fn", ["a"], ["fn", ["x"], ["*", "a", "x"]]], 100], 3]),
                value(json!(300)),
            ),
            (
                "lexical scoping",
                json!([["fn", ["x", "y", "z"],
                        ["+",
                         "x",
                         [["fn", ["x"],
                           ["define", "z", 100],
                           ["print", ["quote", "xyz="], "x", "y", "z"],
                           ["*", "x", "y", "z"]],
                          4],
                         "z"]],
                       1, 2, 3]),
                value(json!(804)),
            ),
            ("array & get", json!(["get", ["array", 10, 20, 30], 1]), value(json!(20))),
            ("define", json!(["define", "x", 1000]), value(json!(null))),
            ("define get", json!("x"), value(json!(1000))),
            ("define inc", json!(["define", "inc", ["fn", ["x"], ["+", "x", 1]]]), value(json!(null))),
            ("inc", json!(["inc", 2]), value(json!(3))),
            ("inc keeps global x", json!("x"), value(json!(1000))),
            (
                "define factorial",
                json!(["define", "factorial",
                       ["fn", ["n"],
                        ["if", ["=", "n", 0],
                         1,
                         ["*", "n", ["factorial", ["-", "n", 1]]]]]]),
                value(json!(null)),
            ),
            ("factorial", json!(["factorial", 7]), value(json!(5040))),
            (
                "define fib",
                json!(["define", "fib",
                       ["fn", ["n"],
                        ["if", ["<", "n", 2],
                         1,
                         ["+", ["fib", ["-", "n", 1]], ["fib", ["-", "n", 2]]]]]]),
                value(json!(null)),
            ),
            ("fib", json!(["fib", 20]), value(json!(10946))),
        ],
    );
}

#[test]
fn test_prelude_macros() {
    let interpreter = session();
    run_scenarios(
        &interpreter,
        vec![
            ("let macro 0", json!(["let", [], 12]), value(json!(12))),
            (
                "let macro 0 scope",
                json!(["let", [], ["define", "nested", 12], "nested"]),
                value(json!(12)),
            ),
            ("let body define stays local", json!("nested"), SpecificError("undefined: \"nested\"")),
            ("let macro 1", json!(["let", ["x", 12], ["+", 1, "x"]]), value(json!(13))),
            ("let macro 2", json!(["let", ["x", 12, "y", 10], ["*", "y", "x"]]), value(json!(120))),
            (
                "define fahrenheit",
                json!(["define", "fahrenheit", ["fn", ["c"], ["+", ["*", "c", ["/", 9, 5]], 32]]]),
                value(json!(null)),
            ),
            ("fahrenheit", json!(["fahrenheit", 10]), value(json!(50))),
            ("-> macro", json!(["->", 5, ["-", 1, 1, 1], ["*", 10]]), value(json!(20))),
            (
                "redefine fahrenheit with ->",
                json!(["define", "fahrenheit",
                       ["fn", ["c"], ["->", "c", ["*", 9], ["/", 5], ["+", 32]]]]),
                value(json!(null)),
            ),
            ("fahrenheit threaded", json!(["fahrenheit", 10]), value(json!(50))),
        ],
    );
}

#[test]
fn test_user_defined_threading_macro() {
    // The same `->` written by hand, on a session without the prelude
    let interpreter = Interpreter::new();
    run_scenarios(
        &interpreter,
        vec![
            (
                "define-syntax ->>",
                json!(["define-syntax", "->>",
                       ["fn", ["x", "env", "menv"],
                        ["if", [">", ["get", "x", ["quote", "length"]], 2],
                         ["append",
                          ["array", ["quote", "->>"]],
                          ["array", ["append", ["get", "x", 2], ["array", ["get", "x", 1]]]],
                          ["slice", "x", 3]],
                         ["get", "x", 1]]]]),
                value(json!(null)),
            ),
            // Thread-last: the value becomes the final argument
            ("->>", json!(["->>", 2, ["-", 10], ["/", 16]]), value(json!(2))),
            ("->> quoted", json!(["quote", ["->>", 1]]), value(json!(["->>", 1]))),
        ],
    );
}

#[test]
fn test_failures() {
    let interpreter = session();
    run_scenarios(
        &interpreter,
        vec![
            ("undefined variable", json!("undefinedName"), SpecificError("undefined: \"undefinedName\"")),
            ("empty application", json!([]), SpecificError("illegal function call")),
            ("call a number", json!([100]), SpecificError("cannot call non-function 100")),
            ("call a string", json!([["quote", "f"], 1]), SpecificError("cannot call non-function")),
            ("malformed if", json!(["if"]), SpecificError("illegal function call")),
            ("get on undefined", json!(["get", ["get", ["array"], 0], 0]), SpecificError("Type error")),
            ("mixed comparison", json!(["<", 1, ["quote", "2"]]), SpecificError("Type error")),
            ("arity", json!(["not"]), SpecificError("ArityError")),
            // A failed form leaves earlier definitions intact
            ("define", json!(["define", "kept", 1]), value(json!(null))),
            ("failing define", json!(["define", "kept", ["nope"]]), SpecificError("undefined")),
            ("kept", json!("kept"), value(json!(1))),
        ],
    );
}

#[test]
fn test_interpreter_sessions_are_independent() {
    let first = session();
    let second = session();
    first
        .evaluate(&to_value(json!(["define", "only-here", 1])))
        .unwrap_or_else(|err| panic!("define failed: {err}"));

    assert!(first.env().contains("only-here"));
    assert!(matches!(
        second.evaluate(&to_value(json!("only-here"))),
        Err(Error::UndefinedVariable { .. })
    ));
}
