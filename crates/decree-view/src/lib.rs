//! Presentation adapter for the rules listing.
//!
//! A pure mapping from query state to a renderable structure. The adapter
//! consumes exactly the observable state (`Idle | Pending | Ready |
//! Failed` plus payload) and nothing else; it has no knowledge of
//! transport details and performs no I/O.

mod rules_table;

pub use rules_table::{rules_view, rules_view_with, RuleRow, RulesView, ViewOptions};
