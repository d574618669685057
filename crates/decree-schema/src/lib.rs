//! Typed schema for the Decree rules API.
//!
//! This crate is the hand-authored equivalent of generated client types: it
//! defines the shape of every entity the API exposes (users, rules, pages,
//! likes, tokens), the strict input/output contract of every operation, and
//! the decoding step that turns a wire payload into those shapes.
//!
//! # Example
//!
//! ```ignore
//! use decree_schema::operations::{ListRules, ListRulesVariables};
//! use decree_schema::Operation;
//!
//! let variables = ListRulesVariables::new(20);
//! ListRules::validate(&variables)?;
//!
//! // DOCUMENT and NAME are what go over the wire.
//! assert_eq!(ListRules::NAME, "RulesList");
//! ```
//!
//! Decoding is strict: a payload missing a required field or carrying a
//! type-incompatible value produces a [`SchemaMismatchError`], never a
//! silently defaulted value.

mod decode;
mod entities;
mod error;
mod operation;
pub mod operations;

pub use decode::decode;
pub use entities::{
    Cursor, LikesUpdate, PageInfo, Rule, RulePage, User, UserPage, UserToken,
};
pub use error::{SchemaMismatchError, ValidationError};
pub use operation::{Operation, OperationKind};
