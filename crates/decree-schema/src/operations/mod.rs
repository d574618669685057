//! The operation inventory of the rules API.
//!
//! Read path:
//! - [`ListRules`]: paginated rule listing with authors and like counts.
//! - [`ListUsers`]: paginated user listing with an optional name filter.
//!
//! Mutations (declared contracts; the client sends them but attaches no
//! read-path logic):
//! - [`CreateRule`], [`CreateUser`], [`DeleteRule`], [`Like`], [`Login`],
//!   [`UpdateUser`].

mod list_rules;
mod list_users;
mod mutations;

pub use list_rules::{
    LikerRef, ListRules, ListRulesData, ListRulesVariables, RuleAuthor, RuleItem, RuleLikes,
    RuleWindow, DEFAULT_LIKES_LIMIT,
};
pub use list_users::{ListUsers, ListUsersData, ListUsersVariables, UserItem, UserWindow};
pub use mutations::{
    CreateRule, CreateRuleData, CreateRuleVariables, CreateUser, CreateUserData,
    CreateUserVariables, DeleteRule, DeleteRuleData, DeleteRuleVariables, Like, LikeData,
    LikeVariables, Login, LoginData, LoginVariables, RuleSnapshot, UpdateUser, UpdateUserData,
    UpdateUserVariables, UserSnapshot,
};
