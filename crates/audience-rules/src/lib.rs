//! # audience-rules: Visibility rules for audience targeting
//!
//! Decides whether a single user may see a piece of content, based on the
//! visibility rule persisted alongside that content.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  VisibilityRule (persisted JSON)             │
//! │  all | groups | rules {AND|OR, conditions}   │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Rule Evaluator                              │
//! │  ├─ Group allow-list intersection            │
//! │  ├─ AND / OR with left-to-right short-circuit│
//! │  └─ Condition evaluator (per field/operator) │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  bool: visible to this UserSnapshot          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Evaluation is pure: resolving the [`UserSnapshot`] is the caller's job and
//! happens once per request, not once per rule.
//!
//! ## Examples
//!
//! ```
//! use audience_rules::{evaluate_rule, UserSnapshot, VisibilityRule};
//! use audience_types::UserId;
//!
//! let rule = VisibilityRule::from_json(r#"{
//!     "type": "rules",
//!     "ruleSet": {
//!         "logic": "AND",
//!         "conditions": [
//!             {"field": "department", "operator": "equals", "value": "engineering"},
//!             {"field": "job_title", "operator": "starts_with", "value": "Senior"}
//!         ]
//!     }
//! }"#).unwrap();
//!
//! let user = UserSnapshot::new(UserId::random())
//!     .with_department("Engineering")
//!     .with_job_title("Senior Software Engineer");
//!
//! assert!(evaluate_rule(&rule, &user));
//! ```

pub mod evaluator;
pub mod rule;
pub mod snapshot;

#[cfg(test)]
mod properties;

pub use evaluator::{evaluate_condition, evaluate_rule, evaluate_rule_set};
pub use rule::{
    ConditionField, ConditionOperator, Logic, RuleCondition, RuleError, RuleIssue, RuleSet,
    VisibilityRule,
};
pub use snapshot::UserSnapshot;
