//! Strict decoding of wire payloads into operation result types.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SchemaMismatchError;

/// Decode a `data` payload into an operation's result type.
///
/// Fails with [`SchemaMismatchError`] when a required field is absent or a
/// value has an incompatible type. Absent-but-allowed fields decode to
/// `None`; they are never conflated with an empty string or zero.
pub fn decode<T: DeserializeOwned>(
    operation: &'static str,
    data: Value,
) -> Result<T, SchemaMismatchError> {
    serde_json::from_value(data).map_err(|err| SchemaMismatchError::new(operation, err.to_string()))
}
