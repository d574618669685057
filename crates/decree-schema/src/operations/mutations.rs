//! Mutation contracts.
//!
//! These declare the input/output shapes of the write operations. The
//! client sends them like any other operation but attaches no read-path
//! logic; whether a mutation touches cached data is a client configuration
//! choice.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::entities::{LikesUpdate, UserToken};
use crate::error::ValidationError;
use crate::operation::{Operation, OperationKind};

/// A rule as returned by the write operations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleSnapshot {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub created: String,
}

/// A user as returned by the write operations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserSnapshot {
    pub id: String,
    pub name: String,
}

/// Create a rule authored by the authenticated user.
#[derive(Debug, Clone, Copy)]
pub struct CreateRule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRuleVariables {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CreateRuleVariables {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            detail: None,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateRuleData {
    #[serde(rename = "createRule")]
    pub create_rule: RuleSnapshot,
}

impl Operation for CreateRule {
    const NAME: &'static str = "RuleCreate";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = r#"
        mutation RuleCreate($summary: String!, $detail: String) {
            createRule(summary: $summary, detail: $detail) {
                id
                summary
                detail
                created
            }
        }
    "#;

    type Variables = CreateRuleVariables;
    type Data = CreateRuleData;

    fn validate(variables: &Self::Variables) -> Result<(), ValidationError> {
        if variables.summary.trim().is_empty() {
            return Err(ValidationError::new(Self::NAME, "summary must not be empty"));
        }
        Ok(())
    }
}

/// Register a user.
#[derive(Debug, Clone, Copy)]
pub struct CreateUser;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateUserVariables {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateUserData {
    #[serde(rename = "createUser")]
    pub create_user: UserSnapshot,
}

impl Operation for CreateUser {
    const NAME: &'static str = "UserCreate";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = r#"
        mutation UserCreate($name: String!, $email: String!, $password: String!) {
            createUser(name: $name, email: $email, password: $password) {
                id
                name
            }
        }
    "#;

    type Variables = CreateUserVariables;
    type Data = CreateUserData;

    fn validate(variables: &Self::Variables) -> Result<(), ValidationError> {
        if variables.name.trim().is_empty() {
            return Err(ValidationError::new(Self::NAME, "name must not be empty"));
        }
        if variables.email.trim().is_empty() {
            return Err(ValidationError::new(Self::NAME, "email must not be empty"));
        }
        if variables.password.is_empty() {
            return Err(ValidationError::new(Self::NAME, "password must not be empty"));
        }
        Ok(())
    }
}

/// Delete a rule by identifier.
///
/// The result is the deleted identifier, or `None` when nothing matched.
#[derive(Debug, Clone, Copy)]
pub struct DeleteRule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteRuleVariables {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteRuleData {
    #[serde(rename = "deleteRule", default)]
    pub delete_rule: Option<String>,
}

impl Operation for DeleteRule {
    const NAME: &'static str = "RuleDelete";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = r#"
        mutation RuleDelete($id: ID!) {
            deleteRule(id: $id)
        }
    "#;

    type Variables = DeleteRuleVariables;
    type Data = DeleteRuleData;
}

/// Like and unlike rules in one call.
#[derive(Debug, Clone, Copy)]
pub struct Like;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LikeVariables {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove: Option<Vec<String>>,
}

impl LikeVariables {
    pub fn add(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.add = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn remove(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.remove = Some(ids.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LikeData {
    #[serde(default)]
    pub like: Option<LikesUpdate>,
}

impl Operation for Like {
    const NAME: &'static str = "Like";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = r#"
        mutation Like($add: [ID!], $remove: [ID!]) {
            like(add: $add, remove: $remove) {
                added
                removed
            }
        }
    "#;

    type Variables = LikeVariables;
    type Data = LikeData;

    fn validate(variables: &Self::Variables) -> Result<(), ValidationError> {
        let (Some(add), Some(remove)) = (&variables.add, &variables.remove) else {
            return Ok(());
        };
        let added: HashSet<&str> = add.iter().map(String::as_str).collect();
        if let Some(id) = remove.iter().find(|id| added.contains(id.as_str())) {
            return Err(ValidationError::new(
                Self::NAME,
                format!("id {id:?} appears in both add and remove"),
            ));
        }
        Ok(())
    }
}

/// Exchange credentials for a bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Login;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginVariables {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginData {
    pub login: UserToken,
}

impl Operation for Login {
    const NAME: &'static str = "UserLogin";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = r#"
        mutation UserLogin($email: String!, $password: String!) {
            login(email: $email, password: $password) {
                token
                expiresAt
            }
        }
    "#;

    type Variables = LoginVariables;
    type Data = LoginData;

    fn validate(variables: &Self::Variables) -> Result<(), ValidationError> {
        if variables.email.trim().is_empty() {
            return Err(ValidationError::new(Self::NAME, "email must not be empty"));
        }
        if variables.password.is_empty() {
            return Err(ValidationError::new(Self::NAME, "password must not be empty"));
        }
        Ok(())
    }
}

/// Update the authenticated user's profile.
#[derive(Debug, Clone, Copy)]
pub struct UpdateUser;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateUserVariables {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateUserData {
    #[serde(rename = "updateUser")]
    pub update_user: UserSnapshot,
}

impl Operation for UpdateUser {
    const NAME: &'static str = "UserUpdate";
    const KIND: OperationKind = OperationKind::Mutation;
    const DOCUMENT: &'static str = r#"
        mutation UserUpdate($name: String) {
            updateUser(name: $name) {
                id
                name
            }
        }
    "#;

    type Variables = UpdateUserVariables;
    type Data = UpdateUserData;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn like_rejects_overlapping_sets() {
        let vars = LikeVariables::default()
            .add(["r1", "r2"])
            .remove(["r2", "r3"]);
        let err = Like::validate(&vars).unwrap_err();
        assert!(err.reason.contains("r2"));
    }

    #[test]
    fn like_accepts_disjoint_sets() {
        let vars = LikeVariables::default().add(["r1"]).remove(["r2"]);
        assert!(Like::validate(&vars).is_ok());

        // One-sided calls are fine too.
        assert!(Like::validate(&LikeVariables::default().add(["r1"])).is_ok());
        assert!(Like::validate(&LikeVariables::default()).is_ok());
    }

    #[test]
    fn create_rule_requires_a_summary() {
        assert!(CreateRule::validate(&CreateRuleVariables::new("  ")).is_err());
        assert!(CreateRule::validate(&CreateRuleVariables::new("No shoes")).is_ok());
    }

    #[test]
    fn delete_rule_result_may_be_absent() {
        let data: DeleteRuleData = serde_json::from_value(json!({"deleteRule": null})).unwrap();
        assert_eq!(data.delete_rule, None);

        let data: DeleteRuleData = serde_json::from_value(json!({"deleteRule": "r1"})).unwrap();
        assert_eq!(data.delete_rule.as_deref(), Some("r1"));
    }

    #[test]
    fn likes_update_decodes_disjoint_sets() {
        let data: LikeData = serde_json::from_value(json!({
            "like": {"added": [1, 2], "removed": [3]},
        }))
        .unwrap();
        let update = data.like.unwrap();
        assert_eq!(update.added, vec![1, 2]);
        assert_eq!(update.removed, vec![3]);
    }

    #[test]
    fn login_decodes_a_token() {
        let data: LoginData = serde_json::from_value(json!({
            "login": {"token": "jwt", "expiresAt": 1700000000},
        }))
        .unwrap();
        assert_eq!(data.login.token, "jwt");
    }
}
