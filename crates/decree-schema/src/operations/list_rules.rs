//! The `RulesList` query: one window of rules with authors and likes.

use serde::{Deserialize, Serialize};

use crate::entities::{Cursor, PageInfo};
use crate::error::ValidationError;
use crate::operation::{Operation, OperationKind};

/// Window size applied to each rule's nested `likes` relation when the
/// caller does not choose one.
pub const DEFAULT_LIKES_LIMIT: i32 = 20;

/// List rules with pagination.
#[derive(Debug, Clone, Copy)]
pub struct ListRules;

/// Variables for [`ListRules`].
///
/// `limit` is required and must be positive. The nested `likes` relation
/// carries its own window size, independent of the parent's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRulesVariables {
    pub limit: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Cursor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub likes_limit: i32,
}

impl ListRulesVariables {
    pub fn new(limit: i32) -> Self {
        Self {
            limit,
            after: None,
            user_id: None,
            likes_limit: DEFAULT_LIKES_LIMIT,
        }
    }

    /// Start the window after the given cursor.
    pub fn after(mut self, cursor: impl Into<Cursor>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    /// Restrict the listing to rules authored by one user.
    pub fn authored_by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Window size for each rule's nested `likes` relation.
    pub fn likes_limit(mut self, limit: i32) -> Self {
        self.likes_limit = limit;
        self
    }

    /// Variables for the window after `info`, keeping the same filters.
    ///
    /// `None` when `info` reports no next page; the pagination contract
    /// guarantees a request past the last window would come back empty.
    pub fn next_page(&self, info: &PageInfo) -> Option<Self> {
        let cursor = info.next_cursor()?;
        Some(Self {
            after: Some(cursor.clone()),
            ..self.clone()
        })
    }
}

/// Result of [`ListRules`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListRulesData {
    pub rules: RuleWindow,
}

/// The selected window of rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleWindow {
    pub page_info: PageInfo,
    pub rules: Vec<RuleItem>,
}

/// One rule as selected by the listing document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleItem {
    pub id: String,
    pub summary: String,
    pub user: RuleAuthor,
    pub likes: RuleLikes,
}

/// The authoring user, selected by name only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleAuthor {
    pub name: String,
}

/// The nested window of liking users.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleLikes {
    pub page_info: PageInfo,
    pub users: Vec<LikerRef>,
}

/// A liking user, selected by identifier only.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LikerRef {
    pub id: String,
}

impl Operation for ListRules {
    const NAME: &'static str = "RulesList";
    const KIND: OperationKind = OperationKind::Query;
    const DOCUMENT: &'static str = r#"
        query RulesList($limit: Int!, $after: ID, $userId: ID, $likesLimit: Int!) {
            rules(limit: $limit, after: $after, userId: $userId) {
                pageInfo {
                    startCursor
                    endCursor
                    hasNextPage
                    hasPreviousPage
                }
                rules {
                    id
                    summary
                    user {
                        name
                    }
                    likes(limit: $likesLimit) {
                        pageInfo {
                            startCursor
                            endCursor
                            hasNextPage
                            hasPreviousPage
                        }
                        users {
                            id
                        }
                    }
                }
            }
        }
    "#;

    type Variables = ListRulesVariables;
    type Data = ListRulesData;

    fn validate(variables: &Self::Variables) -> Result<(), ValidationError> {
        if variables.limit <= 0 {
            return Err(ValidationError::new(
                Self::NAME,
                format!("limit must be positive, got {}", variables.limit),
            ));
        }
        if variables.likes_limit <= 0 {
            return Err(ValidationError::new(
                Self::NAME,
                format!(
                    "likes limit must be positive, got {}",
                    variables.likes_limit
                ),
            ));
        }
        Ok(())
    }
}
