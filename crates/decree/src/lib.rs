//! Decree: a typed query client for the rules API.
//!
//! This is the umbrella crate that re-exports the public API:
//!
//! - [`mod@schema`]: entities, operations, and strict decoding.
//! - the client: observable query execution with coalescing and caching
//!   (re-exported at the root).
//! - [`mod@view`]: the pure presentation adapter for the rules listing.
//!
//! # Example
//!
//! ```ignore
//! use decree::prelude::*;
//!
//! let client = QueryClient::builder("https://api.example.com/query").build()?;
//! let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
//!
//! let view = rules_view(&handle.settled().await);
//! ```

pub use decree_client::*;

/// Schema module: entities, operations, decoding.
pub mod schema {
    pub use decree_schema::*;
}

/// Presentation adapter module.
pub mod view {
    pub use decree_view::*;
}

pub mod prelude;
