//! Tolerant accessors for loosely-typed server payloads.
//!
//! The server's responses are arbitrary JSON whose field types drift
//! between string and number from one firmware to the next, so every
//! extraction point coerces instead of assuming a shape.

use serde_json::Value;

/// A value counts as unset when it is null, false, zero, or an empty
/// string/container.
pub(crate) fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Integer coercion across the shapes the server uses for flags and ids:
/// numbers, numeric strings, and booleans.
pub(crate) fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Float coercion for durations and positions.
pub(crate) fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Render a scalar the way it appears in a command argument: strings
/// verbatim, numbers in decimal. Containers and null yield `None`.
pub(crate) fn as_plain_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
