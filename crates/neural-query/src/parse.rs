//! Field helpers shared by the JSON query parsers.

use neural_core::{Error, Result};
use serde_json::{Map, Value};

/// Default number of neighbors when `k` is omitted.
pub const DEFAULT_K: u32 = 10;

/// Borrow `value` as a JSON object.
pub(crate) fn as_object<'a>(value: &'a Value, query: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::parse(format!("[{query}] query malformed, expected an object")))
}

/// Read an optional string field. `null` counts as absent.
pub(crate) fn string_field(
    obj: &Map<String, Value>,
    query: &str,
    field: &str,
) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::parse(format!(
            "[{query}] '{field}' must be a string, got {other}"
        ))),
    }
}

/// Read a required string field.
pub(crate) fn required_string(
    obj: &Map<String, Value>,
    query: &'static str,
    field: &'static str,
) -> Result<String> {
    string_field(obj, query, field)?.ok_or_else(|| Error::missing_field(query, field))
}

/// Validate a neighbor count.
pub(crate) fn validate_k(query: &'static str, k: i64) -> Result<u32> {
    if k <= 0 || k > i64::from(u32::MAX) {
        return Err(Error::InvalidNeighborCount { query, k });
    }
    Ok(k as u32)
}

/// Read the optional `k` field, defaulting to [`DEFAULT_K`].
pub(crate) fn k_field(obj: &Map<String, Value>, query: &'static str) -> Result<u32> {
    match obj.get("k") {
        None | Some(Value::Null) => Ok(DEFAULT_K),
        Some(value) => {
            let k = value.as_i64().ok_or_else(|| {
                Error::parse(format!("[{query}] 'k' must be an integer, got {value}"))
            })?;
            validate_k(query, k)
        }
    }
}
