//! The client error taxonomy.
//!
//! Every expected failure normalizes into one of four kinds, surfaced as
//! `QueryState::Failed`; callers inspect state rather than catching
//! panics. Only transport failures are retriable, and retrying is caller
//! policy; the client never retries on its own.

use std::fmt;

use serde_json::Value;

pub use decree_schema::{SchemaMismatchError, ValidationError};

use crate::wire::ServerError;

/// A connection-level failure: the request never produced a well-formed
/// response. Retriable at the caller's discretion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// The response body was not a well-formed envelope.
    #[error("invalid response body: {0}")]
    InvalidBody(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for TransportError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for TransportError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// The server processed the request but reported failure.
///
/// Carries the full structured error list, plus whatever partial data came
/// with it. Partial results are exposed, not discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionError {
    pub errors: Vec<ServerError>,
    pub partial_data: Option<Value>,
}

impl ExecutionError {
    /// All error messages joined into one line.
    pub fn joined_messages(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "server reported {} error(s): {}",
            self.errors.len(),
            self.joined_messages()
        )
    }
}

impl std::error::Error for ExecutionError {}

/// The discriminated failure carried by `QueryState::Failed`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// Malformed variables, rejected before any network activity.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Connection or timeout failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Server-reported execution failure.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Response shape violates the operation's contract.
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),
}

impl QueryError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Only transport failures qualify; validation, execution, and schema
    /// mismatches would fail identically on a retry.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Stable short name of the error kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Transport(_) => "transport",
            Self::Execution(_) => "execution",
            Self::SchemaMismatch(_) => "schema-mismatch",
        }
    }
}
