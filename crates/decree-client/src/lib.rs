//! Query execution client for the Decree rules API.
//!
//! This crate executes typed operations against a GraphQL-style endpoint
//! and exposes each execution as an observable value that moves through
//! exactly these states, in order, with no skipping:
//!
//! ```text
//! Idle -> Pending -> (Ready(data) | Failed(error))
//! ```
//!
//! A `Ready` or `Failed` state may be followed by a new `Pending` when the
//! caller refetches or a poll fires.
//!
//! # Example
//!
//! ```ignore
//! use decree_client::{QueryClient, QueryOptions};
//! use decree_schema::operations::{ListRules, ListRulesVariables};
//!
//! let client = QueryClient::builder("https://api.example.com/query").build()?;
//!
//! let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
//! match handle.settled().await {
//!     QueryState::Ready(data) => println!("{} rules", data.rules.rules.len()),
//!     QueryState::Failed(err) => eprintln!("fetch failed: {err}"),
//!     _ => unreachable!("settled() only returns terminal states"),
//! }
//! ```
//!
//! # Coalescing and caching
//!
//! Concurrent executions with an identical cache key (operation name plus
//! canonical variables) share one in-flight network request; every
//! observer resolves to the same shared payload. Completed results are
//! memoized in a document cache consulted per [`FetchPolicy`], and an
//! optional [`NormalizedCache`] accumulates entity snapshots across
//! queries.
//!
//! # Failure modes
//!
//! All expected failures normalize into [`QueryState::Failed`] with a
//! discriminated [`QueryError`]; the client never panics past its boundary
//! for an expected failure mode. Nothing is retried automatically;
//! retriability is advertised via [`QueryError::is_retriable`] and left to
//! the caller.

mod cache;
mod client;
mod error;
mod state;
mod transport;
mod wire;

pub use cache::{CacheKey, DocumentCache, EntityKey, NormalizedCache};
pub use client::{
    FetchPolicy, MutationCachePolicy, PreparedQuery, QueryClient, QueryClientBuilder, QueryHandle,
    QueryOptions,
};
pub use error::{ExecutionError, QueryError, TransportError};
pub use state::QueryState;
pub use transport::{Transport, TransportBuilder, TransportConfig};
pub use wire::{ErrorLocation, PathSegment, ServerError, WireRequest, WireResponse};
