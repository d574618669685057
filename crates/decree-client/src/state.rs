//! The observable query state machine.

use crate::error::QueryError;

/// The state of one query execution.
///
/// Transitions happen in exactly this order, with no skipping:
/// `Idle -> Pending -> (Ready | Failed)`. A settled state may be followed
/// by a new `Pending` when the caller refetches or a poll fires.
/// `Pending` represents a suspended awaitable operation at the network
/// boundary, never a blocked thread.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// No execution has been requested yet.
    Idle,
    /// The operation is in flight.
    Pending,
    /// The operation resolved with decoded data.
    Ready(T),
    /// The operation failed; see [`QueryError`] for the discriminated kind.
    Failed(QueryError),
}

impl<T> QueryState<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Whether the execution has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Failed(_))
    }

    /// The data, when ready.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// The error, when failed.
    pub fn error(&self) -> Option<&QueryError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Map the ready payload, preserving every other state.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            Self::Idle => QueryState::Idle,
            Self::Pending => QueryState::Pending,
            Self::Ready(data) => QueryState::Ready(f(data)),
            Self::Failed(err) => QueryState::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    #[test]
    fn predicates_match_states() {
        assert!(QueryState::<()>::Idle.is_idle());
        assert!(QueryState::<()>::Pending.is_pending());
        assert!(QueryState::Ready(1).is_settled());
        assert!(QueryState::<()>::Failed(TransportError::Timeout.into()).is_settled());
        assert!(!QueryState::<()>::Pending.is_settled());
    }

    #[test]
    fn accessors_return_payloads() {
        let ready = QueryState::Ready(7);
        assert_eq!(ready.data(), Some(&7));
        assert!(ready.error().is_none());

        let failed = QueryState::<i32>::Failed(TransportError::Timeout.into());
        assert!(failed.data().is_none());
        assert!(failed.error().is_some());
    }

    #[test]
    fn map_touches_only_ready() {
        assert_eq!(QueryState::Ready(2).map(|n| n * 10), QueryState::Ready(20));
        assert_eq!(
            QueryState::<i32>::Pending.map(|n| n * 10),
            QueryState::Pending
        );
    }
}
