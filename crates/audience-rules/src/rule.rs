//! Visibility rule definitions.
//!
//! A rule is attached to a piece of content as a JSON blob. It is either
//! unrestricted (`all`), a group allow-list (`groups`), or a flat AND/OR set
//! of attribute conditions (`rules`). Field and operator tokens that this
//! version does not recognize deserialize to `Unknown` instead of failing, so
//! a rule written by a newer authoring tool still parses.

use std::collections::BTreeSet;

use audience_types::GroupId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Error type for rule parsing.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The payload is not valid JSON or does not match the rule schema.
    #[error("Malformed visibility rule: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

// ============================================================================
// Condition Field
// ============================================================================

/// The user attribute a condition inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    #[serde(alias = "Department")]
    Department,
    #[serde(alias = "Location")]
    Location,
    #[serde(alias = "jobTitle", alias = "JobTitle")]
    JobTitle,
    #[serde(alias = "preferredLanguage", alias = "PreferredLanguage")]
    PreferredLanguage,
    /// The user's group memberships rather than a string attribute.
    #[serde(alias = "Group", alias = "groups")]
    Group,
    /// A token this version does not recognize. Never matches.
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Condition Operator
// ============================================================================

/// Comparison applied between the user attribute and the condition operand.
///
/// String comparisons are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    #[serde(alias = "Equals")]
    Equals,
    #[serde(alias = "notEquals", alias = "NotEquals")]
    NotEquals,
    #[serde(alias = "In")]
    In,
    #[serde(alias = "notIn", alias = "NotIn")]
    NotIn,
    #[serde(alias = "Contains")]
    Contains,
    #[serde(alias = "startsWith", alias = "StartsWith")]
    StartsWith,
    #[serde(alias = "memberOf", alias = "MemberOf")]
    MemberOf,
    #[serde(alias = "notMemberOf", alias = "NotMemberOf")]
    NotMemberOf,
    /// A token this version does not recognize. Never matches.
    #[serde(other)]
    Unknown,
}

impl ConditionOperator {
    /// Whether the operator takes its operand from `values` rather than `value`.
    pub fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

// ============================================================================
// Condition
// ============================================================================

/// A single `field operator value(s)` test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: ConditionField,
    pub operator: ConditionOperator,
    /// Operand for every operator except `In`/`NotIn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Operand list for `In`/`NotIn`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl RuleCondition {
    /// Creates a condition with a single operand.
    pub fn new(field: ConditionField, operator: ConditionOperator, value: &str) -> Self {
        Self {
            field,
            operator,
            value: Some(value.to_string()),
            values: None,
        }
    }

    /// Creates a condition with an operand list (`In` / `NotIn`).
    pub fn with_values<I, S>(field: ConditionField, operator: ConditionOperator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field,
            operator,
            value: None,
            values: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Shorthand for `MemberOf(group)`.
    pub fn member_of(group: GroupId) -> Self {
        Self::new(
            ConditionField::Group,
            ConditionOperator::MemberOf,
            &group.to_string(),
        )
    }

    /// Shorthand for `NotMemberOf(group)`.
    pub fn not_member_of(group: GroupId) -> Self {
        Self::new(
            ConditionField::Group,
            ConditionOperator::NotMemberOf,
            &group.to_string(),
        )
    }
}

// ============================================================================
// Rule Set
// ============================================================================

/// How the conditions of a rule set are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    /// Every condition must hold. An empty set holds vacuously.
    #[default]
    #[serde(alias = "and", alias = "And")]
    And,
    /// At least one condition must hold. An empty set never holds.
    #[serde(alias = "or", alias = "Or")]
    Or,
}

/// A flat group of conditions joined by a single [`Logic`] operator.
///
/// Conditions are evaluated in stored order, short-circuiting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
}

impl RuleSet {
    /// Creates an empty rule set with the given logic.
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            conditions: Vec::new(),
        }
    }

    /// Appends a condition (builder pattern).
    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

// ============================================================================
// Visibility Rule
// ============================================================================

/// The persisted visibility expression attached to content.
///
/// Serialized with a `type` discriminator:
///
/// ```json
/// {"type": "all"}
/// {"type": "groups", "groupIds": ["6f1c2b0a-3d4e-4f50-8a61-7b8c9d0e1f23"]}
/// {"type": "rules", "ruleSet": {"logic": "AND", "conditions": [
///     {"field": "department", "operator": "equals", "value": "Engineering"}
/// ]}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VisibilityRule {
    /// No restriction.
    #[default]
    #[serde(alias = "All")]
    All,
    /// Visible to members of any listed group.
    #[serde(alias = "Groups")]
    Groups {
        #[serde(rename = "groupIds", alias = "group_ids", default)]
        group_ids: BTreeSet<GroupId>,
    },
    /// Visible when the rule set holds.
    #[serde(alias = "Rules")]
    Rules {
        #[serde(rename = "ruleSet", alias = "rule_set")]
        rule_set: RuleSet,
    },
}

impl VisibilityRule {
    /// Parses a rule from its persisted JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a rule embedded in an already-parsed JSON document.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Serializes the rule to its persisted JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Creates a group allow-list rule.
    pub fn groups<I: IntoIterator<Item = GroupId>>(groups: I) -> Self {
        Self::Groups {
            group_ids: groups.into_iter().collect(),
        }
    }

    /// Creates a rule backed by a rule set.
    pub fn rules(rule_set: RuleSet) -> Self {
        Self::Rules { rule_set }
    }

    /// Reports authoring mistakes that make conditions unsatisfiable.
    ///
    /// Evaluation tolerates every issue listed here (the affected condition
    /// simply never matches); validation exists so authoring tools can warn
    /// before the rule is saved.
    pub fn validate(&self) -> Vec<RuleIssue> {
        match self {
            Self::All => Vec::new(),
            Self::Groups { group_ids } if group_ids.is_empty() => vec![RuleIssue::EmptyGroupList],
            Self::Groups { .. } => Vec::new(),
            Self::Rules { rule_set } => validate_rule_set(rule_set),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// A problem found by [`VisibilityRule::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleIssue {
    #[error("group rule lists no groups and can never match")]
    EmptyGroupList,

    #[error("OR rule set has no conditions and can never match")]
    EmptyOrRuleSet,

    #[error("condition {index}: unknown field")]
    UnknownField { index: usize },

    #[error("condition {index}: unknown operator")]
    UnknownOperator { index: usize },

    #[error("condition {index}: {operator:?} requires `value`")]
    MissingValue {
        index: usize,
        operator: ConditionOperator,
    },

    #[error("condition {index}: {operator:?} requires `values`")]
    MissingValues {
        index: usize,
        operator: ConditionOperator,
    },

    #[error("condition {index}: '{value}' is not a valid group id")]
    InvalidGroupId { index: usize, value: String },

    #[error("condition {index}: {operator:?} is not supported on {field:?}")]
    UnsupportedOperator {
        index: usize,
        field: ConditionField,
        operator: ConditionOperator,
    },
}

fn validate_rule_set(rule_set: &RuleSet) -> Vec<RuleIssue> {
    let mut issues = Vec::new();

    if rule_set.logic == Logic::Or && rule_set.conditions.is_empty() {
        issues.push(RuleIssue::EmptyOrRuleSet);
    }

    for (index, condition) in rule_set.conditions.iter().enumerate() {
        validate_condition(index, condition, &mut issues);
    }

    issues
}

fn validate_condition(index: usize, condition: &RuleCondition, issues: &mut Vec<RuleIssue>) {
    let operator = condition.operator;

    if condition.field == ConditionField::Unknown {
        issues.push(RuleIssue::UnknownField { index });
    }
    if operator == ConditionOperator::Unknown {
        issues.push(RuleIssue::UnknownOperator { index });
        return;
    }

    let membership = matches!(
        operator,
        ConditionOperator::MemberOf | ConditionOperator::NotMemberOf
    ) || condition.field == ConditionField::Group;

    if condition.field == ConditionField::Group
        && matches!(
            operator,
            ConditionOperator::Contains | ConditionOperator::StartsWith
        )
    {
        issues.push(RuleIssue::UnsupportedOperator {
            index,
            field: condition.field,
            operator,
        });
        return;
    }

    let operands: Vec<&String> = if operator.takes_list() {
        match &condition.values {
            Some(values) => values.iter().collect(),
            None => {
                issues.push(RuleIssue::MissingValues { index, operator });
                return;
            }
        }
    } else {
        match &condition.value {
            Some(value) => vec![value],
            None => {
                issues.push(RuleIssue::MissingValue { index, operator });
                return;
            }
        }
    };

    if membership {
        for value in operands {
            if value.parse::<GroupId>().is_err() {
                issues.push(RuleIssue::InvalidGroupId {
                    index,
                    value: value.clone(),
                });
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: &str = "6f1c2b0a-3d4e-4f50-8a61-7b8c9d0e1f23";

    #[test]
    fn test_parse_all() {
        let rule = VisibilityRule::from_json(r#"{"type":"all"}"#).unwrap();
        assert_eq!(rule, VisibilityRule::All);
    }

    #[test]
    fn test_parse_groups() {
        let json = format!(r#"{{"type":"groups","groupIds":["{GROUP}"]}}"#);
        let rule = VisibilityRule::from_json(&json).unwrap();
        assert_eq!(rule, VisibilityRule::groups([GROUP.parse().unwrap()]));
    }

    #[test]
    fn test_parse_rules() {
        let json = r#"{
            "type": "rules",
            "ruleSet": {
                "logic": "OR",
                "conditions": [
                    {"field": "department", "operator": "equals", "value": "Engineering"},
                    {"field": "location", "operator": "in", "values": ["New York", "Chicago"]}
                ]
            }
        }"#;

        let rule = VisibilityRule::from_json(json).unwrap();
        let VisibilityRule::Rules { rule_set } = rule else {
            panic!("expected a rules variant");
        };
        assert_eq!(rule_set.logic, Logic::Or);
        assert_eq!(rule_set.conditions.len(), 2);
        assert_eq!(rule_set.conditions[0].field, ConditionField::Department);
        assert_eq!(rule_set.conditions[1].operator, ConditionOperator::In);
        assert_eq!(
            rule_set.conditions[1].values.as_deref(),
            Some(&["New York".to_string(), "Chicago".to_string()][..])
        );
    }

    #[test]
    fn test_logic_defaults_to_and() {
        let rule = VisibilityRule::from_json(r#"{"type":"rules","ruleSet":{}}"#).unwrap();
        assert_eq!(rule, VisibilityRule::rules(RuleSet::new(Logic::And)));
    }

    #[test]
    fn test_camel_case_aliases_accepted() {
        let json = r#"{"type":"rules","ruleSet":{"logic":"and","conditions":[
            {"field":"jobTitle","operator":"startsWith","value":"Senior"},
            {"field":"preferredLanguage","operator":"notIn","values":["de"]}
        ]}}"#;

        let rule = VisibilityRule::from_json(json).unwrap();
        let VisibilityRule::Rules { rule_set } = rule else {
            panic!("expected a rules variant");
        };
        assert_eq!(rule_set.conditions[0].field, ConditionField::JobTitle);
        assert_eq!(
            rule_set.conditions[0].operator,
            ConditionOperator::StartsWith
        );
        assert_eq!(
            rule_set.conditions[1].field,
            ConditionField::PreferredLanguage
        );
        assert_eq!(rule_set.conditions[1].operator, ConditionOperator::NotIn);
    }

    #[test]
    fn test_unknown_tokens_do_not_fail_parsing() {
        let json = r#"{"type":"rules","ruleSet":{"logic":"AND","conditions":[
            {"field":"shoe_size","operator":"equals","value":"44"},
            {"field":"department","operator":"matches_regex","value":"^Eng"}
        ]}}"#;

        let rule = VisibilityRule::from_json(json).unwrap();
        let VisibilityRule::Rules { rule_set } = rule else {
            panic!("expected a rules variant");
        };
        assert_eq!(rule_set.conditions[0].field, ConditionField::Unknown);
        assert_eq!(rule_set.conditions[1].operator, ConditionOperator::Unknown);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(VisibilityRule::from_json("not json").is_err());
        assert!(VisibilityRule::from_json(r#"{"type":"everyone"}"#).is_err());
        assert!(VisibilityRule::from_json(r#"{"type":"groups","groupIds":["x"]}"#).is_err());
    }

    #[test]
    fn test_serialized_form_uses_persisted_tokens() {
        let rule = VisibilityRule::rules(RuleSet::new(Logic::Or).with_condition(
            RuleCondition::new(
                ConditionField::JobTitle,
                ConditionOperator::StartsWith,
                "Senior",
            ),
        ));

        let json = rule.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"rules","ruleSet":{"logic":"OR","conditions":[{"field":"job_title","operator":"starts_with","value":"Senior"}]}}"#
        );
        assert_eq!(VisibilityRule::from_json(&json).unwrap(), rule);
    }

    #[test]
    fn test_validate_clean_rule() {
        let rule = VisibilityRule::rules(
            RuleSet::new(Logic::And)
                .with_condition(RuleCondition::new(
                    ConditionField::Department,
                    ConditionOperator::Equals,
                    "Engineering",
                ))
                .with_condition(RuleCondition::member_of(GROUP.parse().unwrap())),
        );
        assert!(rule.validate().is_empty());
        assert!(VisibilityRule::All.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_operand_mistakes() {
        let rule = VisibilityRule::rules(
            RuleSet::new(Logic::And)
                .with_condition(RuleCondition {
                    field: ConditionField::Location,
                    operator: ConditionOperator::In,
                    value: Some("Boston".to_string()),
                    values: None,
                })
                .with_condition(RuleCondition {
                    field: ConditionField::Department,
                    operator: ConditionOperator::Equals,
                    value: None,
                    values: None,
                })
                .with_condition(RuleCondition::new(
                    ConditionField::Group,
                    ConditionOperator::MemberOf,
                    "engineering",
                )),
        );

        assert_eq!(
            rule.validate(),
            vec![
                RuleIssue::MissingValues {
                    index: 0,
                    operator: ConditionOperator::In
                },
                RuleIssue::MissingValue {
                    index: 1,
                    operator: ConditionOperator::Equals
                },
                RuleIssue::InvalidGroupId {
                    index: 2,
                    value: "engineering".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_validate_reports_unsatisfiable_shapes() {
        assert_eq!(
            VisibilityRule::groups([]).validate(),
            vec![RuleIssue::EmptyGroupList]
        );
        assert_eq!(
            VisibilityRule::rules(RuleSet::new(Logic::Or)).validate(),
            vec![RuleIssue::EmptyOrRuleSet]
        );
        assert!(VisibilityRule::rules(RuleSet::new(Logic::And))
            .validate()
            .is_empty());
    }

    #[test]
    fn test_validate_reports_unknown_tokens() {
        let rule = VisibilityRule::rules(
            RuleSet::new(Logic::And)
                .with_condition(RuleCondition::new(
                    ConditionField::Unknown,
                    ConditionOperator::Equals,
                    "x",
                ))
                .with_condition(RuleCondition::new(
                    ConditionField::Group,
                    ConditionOperator::Contains,
                    GROUP,
                )),
        );

        assert_eq!(
            rule.validate(),
            vec![
                RuleIssue::UnknownField { index: 0 },
                RuleIssue::UnsupportedOperator {
                    index: 1,
                    field: ConditionField::Group,
                    operator: ConditionOperator::Contains
                },
            ]
        );
    }
}
