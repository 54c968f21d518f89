//! Conversion between JSON documents and [`Value`]s.
//!
//! JSON is the natural surface for programs: arrays are sequences, strings
//! are strings (and therefore symbols when evaluated), numbers, booleans and
//! `null` (read as `undefined`) map directly. Objects have no counterpart
//! and are rejected.

use crate::Error;
use crate::ast::Value;

/// Parse JSON text into a value
pub fn parse_json(input: &str) -> Result<Value, Error> {
    let json: serde_json::Value =
        serde_json::from_str(input).map_err(|e| Error::ParseError(format!("Invalid JSON: {e}")))?;

    Value::try_from(json)
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(json: serde_json::Value) -> Result<Self, Error> {
        match json {
            serde_json::Value::Null => Ok(Value::Undefined),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| Error::ParseError(format!("Number out of range: {n}"))),
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            serde_json::Value::Object(_) => Err(Error::ParseError(
                "JSON objects have no value representation; use an array".into(),
            )),
        }
    }
}

/// Convert a value to `serde_json::Value`.
///
/// Integral numbers become JSON integers and `undefined` becomes `null`.
/// Functions, macros, scope handles and non-finite numbers have no JSON
/// form and yield `TypeError`.
pub fn to_json(value: &Value) -> Result<serde_json::Value, Error> {
    match value {
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Undefined => Ok(serde_json::Value::Null),
        Value::List(items) => items
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
        other => Err(Error::TypeError(format!(
            "{} has no JSON representation",
            other.type_name()
        ))),
    }
}

fn number_to_json(n: f64) -> Result<serde_json::Value, Error> {
    if !n.is_finite() {
        return Err(Error::TypeError(format!(
            "{n} has no JSON representation"
        )));
    }
    // Exactly representable integers print without a fractional part
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Ok(serde_json::Value::from(n as i64));
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .ok_or_else(|| Error::TypeError(format!("{n} has no JSON representation")))
}
