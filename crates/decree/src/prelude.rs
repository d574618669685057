//! Prelude module for Decree.
//!
//! Re-exports the most commonly used types for convenient importing:
//!
//! ```ignore
//! use decree::prelude::*;
//! ```

// ============================================================================
// Client
// ============================================================================

pub use decree_client::{
    FetchPolicy, MutationCachePolicy, NormalizedCache, PreparedQuery, QueryClient,
    QueryClientBuilder, QueryError, QueryHandle, QueryOptions, QueryState, Transport,
    TransportBuilder, TransportError,
};

// ============================================================================
// Schema
// ============================================================================

pub use decree_schema::operations::{
    CreateRule, CreateRuleVariables, CreateUser, CreateUserVariables, DeleteRule,
    DeleteRuleVariables, Like, LikeVariables, ListRules, ListRulesData, ListRulesVariables,
    ListUsers, ListUsersData, ListUsersVariables, Login, LoginVariables, UpdateUser,
    UpdateUserVariables,
};
pub use decree_schema::{Cursor, Operation, PageInfo};

// ============================================================================
// View
// ============================================================================

pub use decree_view::{rules_view, rules_view_with, RuleRow, RulesView, ViewOptions};
