//! The `UsersList` query: one window of users, optionally filtered by name.

use serde::{Deserialize, Serialize};

use crate::entities::{Cursor, PageInfo};
use crate::error::ValidationError;
use crate::operation::{Operation, OperationKind};

/// List users with pagination.
#[derive(Debug, Clone, Copy)]
pub struct ListUsers;

/// Variables for [`ListUsers`]. `limit` is required and must be positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersVariables {
    pub limit: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Cursor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ListUsersVariables {
    pub fn new(limit: i32) -> Self {
        Self {
            limit,
            after: None,
            name: None,
        }
    }

    pub fn after(mut self, cursor: impl Into<Cursor>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    /// Filter the listing by display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Variables for the window after `info`, keeping the same filter.
    pub fn next_page(&self, info: &PageInfo) -> Option<Self> {
        let cursor = info.next_cursor()?;
        Some(Self {
            after: Some(cursor.clone()),
            ..self.clone()
        })
    }
}

/// Result of [`ListUsers`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListUsersData {
    pub users: UserWindow,
}

/// The selected window of users.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWindow {
    pub page_info: PageInfo,
    pub users: Vec<UserItem>,
}

/// One user as selected by the listing document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserItem {
    pub id: String,
    pub name: String,
}

impl Operation for ListUsers {
    const NAME: &'static str = "UsersList";
    const KIND: OperationKind = OperationKind::Query;
    const DOCUMENT: &'static str = r#"
        query UsersList($limit: Int!, $after: ID, $name: String) {
            users(limit: $limit, after: $after, name: $name) {
                pageInfo {
                    startCursor
                    endCursor
                    hasNextPage
                    hasPreviousPage
                }
                users {
                    id
                    name
                }
            }
        }
    "#;

    type Variables = ListUsersVariables;
    type Data = ListUsersData;

    fn validate(variables: &Self::Variables) -> Result<(), ValidationError> {
        if variables.limit <= 0 {
            return Err(ValidationError::new(
                Self::NAME,
                format!("limit must be positive, got {}", variables.limit),
            ));
        }
        Ok(())
    }
}
