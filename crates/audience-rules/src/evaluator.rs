//! Visibility rule evaluation engine.
//!
//! Evaluates a [`VisibilityRule`] against a [`UserSnapshot`]. Evaluation is
//! pure and never fails: a condition the engine cannot interpret (unknown
//! token, missing operand, malformed group id) is logged and treated as not
//! matching, while its siblings are still evaluated.

use std::collections::BTreeSet;

use audience_types::GroupId;
use tracing::warn;

use crate::rule::{ConditionField, ConditionOperator, Logic, RuleCondition, RuleSet, VisibilityRule};
use crate::snapshot::UserSnapshot;

// ============================================================================
// Public API
// ============================================================================

/// Evaluates a complete visibility rule.
///
/// - `All` is always visible.
/// - `Groups` is visible when the user belongs to at least one listed group.
/// - `Rules` defers to [`evaluate_rule_set`].
pub fn evaluate_rule(rule: &VisibilityRule, user: &UserSnapshot) -> bool {
    match rule {
        VisibilityRule::All => true,
        VisibilityRule::Groups { group_ids } => !group_ids.is_disjoint(&user.group_ids),
        VisibilityRule::Rules { rule_set } => evaluate_rule_set(rule_set, user),
    }
}

/// Evaluates a flat AND/OR rule set.
///
/// Conditions are checked left to right in stored order and evaluation stops
/// at the first condition that decides the result. An empty AND set is true
/// (nothing is required); an empty OR set is false (nothing can be satisfied).
pub fn evaluate_rule_set(rule_set: &RuleSet, user: &UserSnapshot) -> bool {
    match rule_set.logic {
        Logic::And => rule_set
            .conditions
            .iter()
            .all(|cond| evaluate_condition(cond, user)),
        Logic::Or => rule_set
            .conditions
            .iter()
            .any(|cond| evaluate_condition(cond, user)),
    }
}

// ============================================================================
// Condition Evaluation
// ============================================================================

/// Evaluates a single condition against the user snapshot.
pub fn evaluate_condition(condition: &RuleCondition, user: &UserSnapshot) -> bool {
    match (condition.field, condition.operator) {
        (_, ConditionOperator::Unknown) | (ConditionField::Unknown, _) => {
            unsupported(condition, "unknown field or operator")
        }

        // -- Membership operators ignore the field --
        (_, ConditionOperator::MemberOf) => {
            single_group(condition).is_some_and(|group| user.is_member_of(&group))
        }
        (_, ConditionOperator::NotMemberOf) => {
            single_group(condition).is_some_and(|group| !user.is_member_of(&group))
        }

        // -- Comparison operators on the group field test membership --
        (ConditionField::Group, ConditionOperator::Equals) => {
            single_group(condition).is_some_and(|group| user.is_member_of(&group))
        }
        (ConditionField::Group, ConditionOperator::NotEquals) => {
            single_group(condition).is_some_and(|group| !user.is_member_of(&group))
        }
        (ConditionField::Group, ConditionOperator::In) => {
            group_list(condition).is_some_and(|groups| !groups.is_disjoint(&user.group_ids))
        }
        (ConditionField::Group, ConditionOperator::NotIn) => {
            group_list(condition).is_some_and(|groups| groups.is_disjoint(&user.group_ids))
        }
        (ConditionField::Group, ConditionOperator::Contains | ConditionOperator::StartsWith) => {
            unsupported(condition, "operator not supported on group field")
        }

        // -- String attribute conditions --
        (
            field @ (ConditionField::Department
            | ConditionField::Location
            | ConditionField::JobTitle
            | ConditionField::PreferredLanguage),
            operator,
        ) => compare_attribute(condition, operator, user.attribute(field)),
    }
}

/// Applies a string comparison to an optional attribute value.
///
/// All comparisons fold case. A missing attribute never equals, contains or
/// starts with anything, so the negated operators hold for it.
fn compare_attribute(
    condition: &RuleCondition,
    operator: ConditionOperator,
    attribute: Option<&str>,
) -> bool {
    match operator {
        ConditionOperator::Equals => {
            single_value(condition).is_some_and(|v| attribute.is_some_and(|a| eq_fold(a, v)))
        }
        ConditionOperator::NotEquals => {
            single_value(condition).is_some_and(|v| !attribute.is_some_and(|a| eq_fold(a, v)))
        }
        ConditionOperator::In => value_list(condition).is_some_and(|values| {
            attribute.is_some_and(|a| values.iter().any(|v| eq_fold(a, v)))
        }),
        ConditionOperator::NotIn => value_list(condition).is_some_and(|values| {
            !attribute.is_some_and(|a| values.iter().any(|v| eq_fold(a, v)))
        }),
        ConditionOperator::Contains => single_value(condition).is_some_and(|v| {
            attribute.is_some_and(|a| a.to_lowercase().contains(&v.to_lowercase()))
        }),
        ConditionOperator::StartsWith => single_value(condition).is_some_and(|v| {
            attribute.is_some_and(|a| a.to_lowercase().starts_with(&v.to_lowercase()))
        }),
        // Routed before reaching attribute comparison.
        ConditionOperator::MemberOf | ConditionOperator::NotMemberOf | ConditionOperator::Unknown => {
            unsupported(condition, "operator not supported on attribute field")
        }
    }
}

// ============================================================================
// Operand Helpers
// ============================================================================

fn single_value(condition: &RuleCondition) -> Option<&str> {
    let value = condition.value.as_deref();
    if value.is_none() {
        warn!(
            field = ?condition.field,
            operator = ?condition.operator,
            "Condition is missing its value; treating as non-matching"
        );
    }
    value
}

fn value_list(condition: &RuleCondition) -> Option<&[String]> {
    let values = condition.values.as_deref();
    if values.is_none() {
        warn!(
            field = ?condition.field,
            operator = ?condition.operator,
            "Condition is missing its values; treating as non-matching"
        );
    }
    values
}

/// Parses the condition's `value` as a group id.
fn single_group(condition: &RuleCondition) -> Option<GroupId> {
    let raw = single_value(condition)?;
    match raw.parse::<GroupId>() {
        Ok(group) => Some(group),
        Err(e) => {
            warn!(
                operator = ?condition.operator,
                error = %e,
                "Malformed group id in condition; treating as non-matching"
            );
            None
        }
    }
}

/// Parses the condition's `values` as group ids, skipping malformed entries.
///
/// Returns `None` when no entry parses, so the condition fails rather than
/// degrading into an empty (and trivially satisfied) `NotIn`.
fn group_list(condition: &RuleCondition) -> Option<BTreeSet<GroupId>> {
    let values = value_list(condition)?;
    let mut groups = BTreeSet::new();
    for raw in values {
        match raw.parse::<GroupId>() {
            Ok(group) => {
                groups.insert(group);
            }
            Err(e) => warn!(
                operator = ?condition.operator,
                error = %e,
                "Skipping malformed group id in condition"
            ),
        }
    }
    if groups.is_empty() { None } else { Some(groups) }
}

fn unsupported(condition: &RuleCondition, reason: &str) -> bool {
    warn!(
        field = ?condition.field,
        operator = ?condition.operator,
        reason,
        "Unsupported condition; treating as non-matching"
    );
    false
}

fn eq_fold(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

// ============================================================================
// Tests
// ============================================================================
