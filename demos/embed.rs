//! Embedding jsonlisp in a Rust program.
//!
//! Registers host functions through the typed adapters, loads the prelude,
//! runs a small program and hands the result back as JSON.

use jsonlisp::evaluator::{Arity, NumIter};
use jsonlisp::{Error, Interpreter, Value, parse_json, to_json};

const PROGRAM: &str = r#"[
  ["define", "fahrenheit", ["fn", ["c"], ["->", "c", ["*", 9], ["/", 5], ["+", 32]]]],
  ["define", "readings", ["array", -40, 0, 37, 100]],
  ["define", "convert",
    ["fn", ["xs"],
      ["if", ["=", ["get", "xs", ["quote", "length"]], 0],
        ["array"],
        ["append", ["array", ["fahrenheit", ["get", "xs", 0]]], ["convert", ["slice", "xs", 1]]]]]],
  ["let", ["converted", ["convert", "readings"]],
    ["print", ["quote", "converted:"], "converted"],
    ["array", ["mean", "converted"], ["clamp", ["mean", "converted"], 0, 100]]]
]"#;

fn mean(xs: NumIter<'_>) -> Result<f64, Error> {
    let len = xs.len();
    if len == 0 {
        return Err(Error::TypeError("mean of an empty sequence".into()));
    }
    Ok(xs.sum::<f64>() / len as f64)
}

fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.clamp(lo, hi)
}

fn max_of(first: f64, rest: NumIter<'_>) -> f64 {
    rest.fold(first, f64::max)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut interpreter = Interpreter::new();
    interpreter.load_prelude()?;

    let env = interpreter.env();
    env.register_builtin_operation::<_, (NumIter<'static>,)>("mean", mean);
    env.register_builtin_operation::<_, (f64, f64, f64)>("clamp", clamp);
    env.register_variadic_builtin_operation::<_, (f64, NumIter<'static>)>(
        "max",
        Arity::AtLeast(1),
        max_of,
    );

    let forms = match parse_json(PROGRAM)? {
        Value::List(forms) => forms,
        other => return Err(format!("expected a program, got {other}").into()),
    };
    let result = interpreter.evaluate_all(&forms)?;
    println!("result: {}", to_json(&result)?);

    let peak = interpreter.evaluate(&parse_json(r#"["max", 3, 9, 4]"#)?)?;
    println!("max: {peak}");

    // Errors carry enough context to report without a backtrace
    if let Err(err) = interpreter.evaluate(&parse_json(r#"["mean", ["array"]]"#)?) {
        println!("expected failure: {err}");
    }
    Ok(())
}
