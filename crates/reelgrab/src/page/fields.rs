use serde_json::{Map, Value};

/// Return the first non-null value among `keys`, checked in order.
pub fn first_present_field<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Return the first value among `keys` that renders as non-empty text.
///
/// Unlike [`first_present_field`], empty strings and zeros fall through to
/// the next key.
pub fn first_text_field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(scalar_to_string)
}

/// Render a scalar JSON value as text. Empty strings, `false`, `0`,
/// containers and null count as absent.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}
