//! Lenient coercion of loosely typed JSON values.
//!
//! The provider is inconsistent about types: amounts arrive as numbers or as
//! numeric strings, ids as numbers or strings. These helpers turn a
//! [`serde_json::Value`] into the requested scalar or fall back to a default,
//! so a single odd field never fails a whole reply.

use serde_json::{Map, Value};

/// Parse a string the way a numeric check would accept it: surrounding
/// whitespace is ignored, integers and finite decimals are accepted.
fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(int as f64);
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Coerce to an integer. Decimals are truncated toward zero.
pub fn to_int(value: &Value, default: i64) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(default),
        Value::String(s) => {
            if let Ok(int) = s.trim().parse::<i64>() {
                return int;
            }
            parse_numeric(s).map(|f| f as i64).unwrap_or(default)
        }
        _ => default,
    }
}

/// Coerce to a string. Numbers are rendered, booleans become `"1"`/`""`,
/// arrays, objects and null yield the default.
pub fn to_string(value: &Value, default: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        _ => default.to_string(),
    }
}

/// Coerce to a float.
pub fn to_float(value: &Value, default: f64) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(default),
        Value::String(s) => parse_numeric(s).unwrap_or(default),
        _ => default,
    }
}

/// Look up a key, treating an explicit `null` the same as a missing key.
pub fn field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).filter(|v| !v.is_null())
}

/// Optional integer field.
pub fn opt_int(object: &Map<String, Value>, key: &str) -> Option<i64> {
    field(object, key).map(|v| to_int(v, 0))
}

/// Optional string field.
pub fn opt_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    field(object, key).map(|v| to_string(v, ""))
}

/// Optional float field.
pub fn opt_float(object: &Map<String, Value>, key: &str) -> Option<f64> {
    field(object, key).map(|v| to_float(v, 0.0))
}
