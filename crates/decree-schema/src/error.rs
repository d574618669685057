//! Schema-level error types.

/// The caller supplied variables that violate an operation's input contract.
///
/// Raised synchronously, before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid variables for {operation}: {reason}")]
pub struct ValidationError {
    /// Name of the operation whose contract was violated.
    pub operation: &'static str,
    /// Human-readable description of the violation.
    pub reason: String,
}

impl ValidationError {
    pub fn new(operation: &'static str, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

/// The server payload does not match the shape the operation declares.
///
/// A required field was absent or a value had an incompatible type. This
/// indicates client/server version skew and is not retriable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("response for {operation} does not match the expected shape: {detail}")]
pub struct SchemaMismatchError {
    /// Name of the operation whose result failed to decode.
    pub operation: &'static str,
    /// Decoder detail, e.g. the missing field.
    pub detail: String,
}

impl SchemaMismatchError {
    pub fn new(operation: &'static str, detail: impl Into<String>) -> Self {
        Self {
            operation,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::new("RulesList", "limit must be positive");
        assert_eq!(
            err.to_string(),
            "invalid variables for RulesList: limit must be positive"
        );
    }

    #[test]
    fn schema_mismatch_display() {
        let err = SchemaMismatchError::new("RulesList", "missing field `id`");
        assert!(err.to_string().contains("RulesList"));
        assert!(err.to_string().contains("missing field `id`"));
    }
}
