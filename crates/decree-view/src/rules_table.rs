//! The rules table view.

use std::collections::HashSet;
use std::sync::Arc;

use decree_client::QueryState;
use decree_schema::operations::{ListRulesData, RuleItem};

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRow {
    /// 1-based position within the fetched window.
    pub index: usize,
    pub id: String,
    pub summary: String,
    /// Display name of the authoring user.
    pub author: String,
    /// Count of distinct liking users in the fetched likes window.
    pub likes: usize,
}

/// What the rules list should display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesView {
    /// The fetch has not settled yet.
    Loading,
    /// The fetch failed. `detail` is populated only when diagnostics were
    /// explicitly requested; by default no raw error text leaks through.
    Error { detail: Option<String> },
    /// One row per rule. An empty vector renders a header-only table.
    Table(Vec<RuleRow>),
}

impl RulesView {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The rows, when the view is a table.
    pub fn rows(&self) -> Option<&[RuleRow]> {
        match self {
            Self::Table(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Display options for the rules view.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewOptions {
    /// Include an error summary in [`RulesView::Error`]. Off by default;
    /// the generic placeholder carries no raw error detail.
    pub show_diagnostics: bool,
}

/// Map a query state to its display structure, with default options.
///
/// Total over all four states and pure: the same input always yields a
/// structurally identical view.
pub fn rules_view(state: &QueryState<Arc<ListRulesData>>) -> RulesView {
    rules_view_with(state, ViewOptions::default())
}

/// Map a query state to its display structure.
pub fn rules_view_with(state: &QueryState<Arc<ListRulesData>>, options: ViewOptions) -> RulesView {
    match state {
        QueryState::Idle | QueryState::Pending => RulesView::Loading,
        QueryState::Failed(err) => RulesView::Error {
            detail: options.show_diagnostics.then(|| err.to_string()),
        },
        QueryState::Ready(data) => RulesView::Table(rows(data)),
    }
}

fn rows(data: &ListRulesData) -> Vec<RuleRow> {
    data.rules
        .rules
        .iter()
        .enumerate()
        .map(|(i, rule)| RuleRow {
            index: i + 1,
            id: rule.id.clone(),
            summary: rule.summary.clone(),
            author: rule.user.name.clone(),
            likes: distinct_likers(rule),
        })
        .collect()
}

fn distinct_likers(rule: &RuleItem) -> usize {
    rule.likes
        .users
        .iter()
        .map(|liker| liker.id.as_str())
        .collect::<HashSet<_>>()
        .len()
}
