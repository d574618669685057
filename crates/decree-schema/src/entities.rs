//! Canonical entity shapes as returned by the rules API.
//!
//! All entities are immutable value snapshots; the client never mutates
//! fetched data. Listing fields are windows (`RulePage` / `UserPage`) with
//! cursor-based [`PageInfo`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque pagination cursor.
///
/// Cursor values mark a position in an ordered result set and are only
/// stable within a given query signature (sort order, filters). The client
/// never inspects their contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Cursor state for one fetch window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Cursor of the first item in the window, absent when the window is empty.
    #[serde(default)]
    pub start_cursor: Option<Cursor>,
    /// Cursor of the last item in the window, absent when the window is empty.
    #[serde(default)]
    pub end_cursor: Option<Cursor>,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageInfo {
    /// The cursor to pass as `after` to fetch the next window.
    ///
    /// `None` when there is no next window or the current one is empty.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        if self.has_next_page {
            self.end_cursor.as_ref()
        } else {
            None
        }
    }

    /// The cursor marking the start of the current window, for backward
    /// pagination.
    pub fn previous_cursor(&self) -> Option<&Cursor> {
        if self.has_previous_page {
            self.start_cursor.as_ref()
        } else {
            None
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Globally unique, stable identifier.
    pub id: String,
    pub name: String,
    /// Rules authored by this user.
    pub rules: RulePage,
    /// Rules this user has liked.
    pub likes: RulePage,
}

/// A policy/entry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub detail: Option<String>,
    /// Creation timestamp, string-encoded by the server.
    pub created: String,
    /// The authoring user.
    pub user: Box<User>,
    /// Users who liked this rule.
    pub likes: UserPage,
}

/// One window of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePage {
    pub page_info: PageInfo,
    pub rules: Vec<Rule>,
}

/// One window of users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub page_info: PageInfo,
    pub users: Vec<User>,
}

/// Result of a like/unlike mutation: the identifiers actually added and
/// removed. No identifier appears in both sets from a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikesUpdate {
    pub added: Vec<i64>,
    pub removed: Vec<i64>,
}

/// An opaque bearer token with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserToken {
    pub token: String,
    /// Seconds since the Unix epoch.
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_info_decodes_camel_case() {
        let info: PageInfo = serde_json::from_value(json!({
            "startCursor": "a",
            "endCursor": "f",
            "hasNextPage": true,
            "hasPreviousPage": false,
        }))
        .unwrap();
        assert_eq!(info.start_cursor, Some(Cursor::from("a")));
        assert_eq!(info.next_cursor(), Some(&Cursor::from("f")));
        assert_eq!(info.previous_cursor(), None);
    }

    #[test]
    fn page_info_cursors_default_to_none() {
        // An empty window omits both cursors; absence is not an empty string.
        let info: PageInfo = serde_json::from_value(json!({
            "hasNextPage": false,
            "hasPreviousPage": false,
        }))
        .unwrap();
        assert_eq!(info.start_cursor, None);
        assert_eq!(info.end_cursor, None);
        assert_eq!(info.next_cursor(), None);
    }

    #[test]
    fn next_cursor_requires_next_page() {
        let info = PageInfo {
            start_cursor: Some(Cursor::from("a")),
            end_cursor: Some(Cursor::from("f")),
            has_next_page: false,
            has_previous_page: false,
        };
        assert_eq!(info.next_cursor(), None);
    }

    #[test]
    fn user_token_decodes_expiry() {
        let token: UserToken = serde_json::from_value(json!({
            "token": "opaque",
            "expiresAt": 1735689600,
        }))
        .unwrap();
        assert_eq!(token.expires_at, 1_735_689_600);
    }
}
