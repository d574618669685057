//! Wire envelope types.
//!
//! One operation is one POST exchange: the request body carries the
//! document text and a variables mapping, the response body carries a
//! `data` mapping (possibly null) and an optional list of structured
//! errors. Transport framing beyond that lives in [`crate::transport`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The request body for one operation.
#[derive(Debug, Clone, Serialize)]
pub struct WireRequest {
    /// The GraphQL document text.
    pub query: &'static str,

    /// Variables as a key-value mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,

    /// Operation name, for documents with multiple operations.
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<&'static str>,
}

/// The response body for one operation.
///
/// `data` and `errors` are not exclusive: a server may report errors while
/// still returning partial data, and both are preserved.
#[derive(Debug, Clone, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub data: Option<Value>,

    #[serde(default)]
    pub errors: Vec<ServerError>,
}

impl WireResponse {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A structured error reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    pub message: String,

    /// Locations in the document where the error occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,

    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (at ")?;
            for (i, segment) in path.iter().enumerate() {
                if i > 0 {
                    write!(f, ".")?;
                }
                match segment {
                    PathSegment::Field(name) => write!(f, "{name}")?,
                    PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A location in the operation document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: u32,
    pub column: u32,
}

/// A segment in an error path: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_operation_name() {
        let request = WireRequest {
            query: "query RulesList { rules { rules { id } } }",
            variables: Some(json!({"limit": 20})),
            operation_name: Some("RulesList"),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["operationName"], "RulesList");
        assert_eq!(value["variables"]["limit"], 20);
    }

    #[test]
    fn response_defaults_to_empty_errors() {
        let response: WireResponse =
            serde_json::from_value(json!({"data": {"rules": null}})).unwrap();
        assert!(!response.has_errors());
    }

    #[test]
    fn error_path_decodes_fields_and_indices() {
        let err: ServerError = serde_json::from_value(json!({
            "message": "unauthorized",
            "path": ["rules", "rules", 0, "id"],
        }))
        .unwrap();
        assert_eq!(
            err.path.as_ref().unwrap()[2],
            PathSegment::Index(0),
        );
        assert_eq!(err.to_string(), "unauthorized (at rules.rules.[0].id)");
    }

    #[test]
    fn partial_data_is_preserved_alongside_errors() {
        let response: WireResponse = serde_json::from_value(json!({
            "data": {"rules": {"rules": []}},
            "errors": [{"message": "partial failure"}],
        }))
        .unwrap();
        assert!(response.has_errors());
        assert!(response.data.is_some());
    }
}
