//! Helpers for the generic value representation (`serde_json::Value`).
//!
//! Integers and floats share one numeric slot type: every number that passes
//! through a skeleton is normalised through `f64`. Whole numbers are written
//! back in integer form so `255.0` re-serialises as `255`, fractional ones stay
//! floats. No layer below the codecs distinguishes the two.

use serde_json::{Number, Value};

use crate::error::{MarshallerError, Result};
use crate::model::PrimitiveType;

/// Largest magnitude that survives an `f64` round trip as an integer.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Numeric slot value for `f`.
pub fn number(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER {
        Value::Number(Number::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Re-normalise a number through the shared numeric slot type.
/// Non-numeric values are returned unchanged.
pub fn normalize_number(value: &Value) -> Value {
    match value.as_f64() {
        Some(f) if value.is_number() => number(f),
        _ => value.clone(),
    }
}

/// [`normalize_number`] applied to every number inside `value`.
pub fn normalize_deep(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(normalize_deep).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), normalize_deep(v)))
                .collect(),
        ),
        other => normalize_number(other),
    }
}

/// Render a scalar the way it appears in configurable defaults and plain-text
/// payloads: strings unquoted, numbers without a trailing `.0`.
pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(_) => normalize_number(value).to_string(),
        other => other.to_string(),
    }
}

/// Parse text into a scalar of the given primitive type.
pub fn parse_scalar(text: &str, primitive: PrimitiveType) -> Result<Value> {
    let trimmed = text.trim();
    match primitive {
        PrimitiveType::String => Ok(Value::String(text.to_string())),
        PrimitiveType::Integer | PrimitiveType::Float => trimmed
            .parse::<f64>()
            .map(number)
            .map_err(|_| MarshallerError::Codec(format!("'{}' is not a number", trimmed))),
        PrimitiveType::Boolean => match trimmed {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            other => Err(MarshallerError::Codec(format!(
                "'{}' is not a boolean",
                other
            ))),
        },
    }
}

/// Append `name` to a dotted path.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}
