//! The operation contract.
//!
//! Every query and mutation the API exposes is described by a type
//! implementing [`Operation`]: the GraphQL document that goes over the
//! wire, the exact shape of its variables, and the exact shape of its
//! result. This is the compile-time analogue of schema-generated types;
//! there is no runtime type generation.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ValidationError;

/// Whether an operation reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// A named API operation with typed variables and a typed result.
///
/// Implementations are zero-sized marker types; the associated items carry
/// the contract:
///
/// ```ignore
/// use decree_schema::operations::{ListRules, ListRulesVariables};
/// use decree_schema::Operation;
///
/// let vars = ListRulesVariables::new(20);
/// ListRules::validate(&vars)?;
/// let body = serde_json::to_value(&vars)?;
/// ```
pub trait Operation: 'static {
    /// Operation name, sent as `operationName` and used in cache keys.
    const NAME: &'static str;

    /// Query or mutation.
    const KIND: OperationKind;

    /// The GraphQL document text.
    const DOCUMENT: &'static str;

    /// The variables this operation accepts.
    type Variables: Serialize + Send + Sync;

    /// The result shape this operation produces.
    ///
    /// Per-operation selection types, not the canonical entities: a
    /// document only decodes the fields it selects.
    type Data: DeserializeOwned + Send + Sync + 'static;

    /// Check the variables against the operation's input contract.
    ///
    /// Runs before any network activity; a violation is a caller error.
    fn validate(_variables: &Self::Variables) -> Result<(), ValidationError> {
        Ok(())
    }
}
