//! Property tests for rule evaluation.
//!
//! These complement the example-based tests in `evaluator.rs` with
//! invariants that must hold for arbitrary users and conditions.

use proptest::prelude::*;

use audience_types::{GroupId, UserId};

use crate::evaluator::{evaluate_condition, evaluate_rule, evaluate_rule_set};
use crate::rule::{ConditionField, ConditionOperator, Logic, RuleCondition, RuleSet, VisibilityRule};
use crate::snapshot::UserSnapshot;

fn arb_field() -> impl Strategy<Value = ConditionField> {
    prop_oneof![
        Just(ConditionField::Department),
        Just(ConditionField::Location),
        Just(ConditionField::JobTitle),
        Just(ConditionField::PreferredLanguage),
        Just(ConditionField::Group),
        Just(ConditionField::Unknown),
    ]
}

fn arb_operator() -> impl Strategy<Value = ConditionOperator> {
    prop_oneof![
        Just(ConditionOperator::Equals),
        Just(ConditionOperator::NotEquals),
        Just(ConditionOperator::In),
        Just(ConditionOperator::NotIn),
        Just(ConditionOperator::Contains),
        Just(ConditionOperator::StartsWith),
        Just(ConditionOperator::MemberOf),
        Just(ConditionOperator::NotMemberOf),
        Just(ConditionOperator::Unknown),
    ]
}

fn arb_condition() -> impl Strategy<Value = RuleCondition> {
    (
        arb_field(),
        arb_operator(),
        proptest::option::of("[A-Za-z ]{0,12}"),
        proptest::option::of(prop::collection::vec("[A-Za-z ]{0,12}", 0..4)),
    )
        .prop_map(|(field, operator, value, values)| RuleCondition {
            field,
            operator,
            value,
            values,
        })
}

fn arb_user() -> impl Strategy<Value = UserSnapshot> {
    (
        proptest::option::of("[A-Za-z ]{0,12}"),
        proptest::option::of("[A-Za-z ]{0,12}"),
        proptest::option::of("[A-Za-z ]{0,24}"),
        prop::collection::btree_set(any::<[u8; 16]>(), 0..4),
    )
        .prop_map(|(department, location, job_title, groups)| UserSnapshot {
            user_id: UserId::random(),
            department,
            location,
            job_title,
            preferred_language: None,
            group_ids: groups
                .into_iter()
                .map(|b| GroupId::new(uuid_from(b)))
                .collect(),
            active: true,
        })
}

fn uuid_from(bytes: [u8; 16]) -> uuid::Uuid {
    uuid::Uuid::from_bytes(bytes)
}

proptest! {
    /// Property: An empty AND set is satisfied by every user
    #[test]
    fn prop_empty_and_is_vacuously_true(user in arb_user()) {
        prop_assert!(evaluate_rule_set(&RuleSet::new(Logic::And), &user));
    }

    /// Property: An empty OR set is satisfied by no user
    #[test]
    fn prop_empty_or_is_false(user in arb_user()) {
        prop_assert!(!evaluate_rule_set(&RuleSet::new(Logic::Or), &user));
    }

    /// Property: AND is the conjunction and OR the disjunction of the
    /// individual condition results
    #[test]
    fn prop_rule_set_matches_individual_results(
        user in arb_user(),
        conditions in prop::collection::vec(arb_condition(), 0..6),
    ) {
        let results: Vec<bool> = conditions
            .iter()
            .map(|c| evaluate_condition(c, &user))
            .collect();

        let and = RuleSet { logic: Logic::And, conditions: conditions.clone() };
        let or = RuleSet { logic: Logic::Or, conditions };

        prop_assert_eq!(evaluate_rule_set(&and, &user), results.iter().all(|r| *r));
        prop_assert_eq!(evaluate_rule_set(&or, &user), results.iter().any(|r| *r));
    }

    /// Property: Evaluation is deterministic
    #[test]
    fn prop_evaluation_is_deterministic(
        user in arb_user(),
        conditions in prop::collection::vec(arb_condition(), 0..6),
    ) {
        let rule = VisibilityRule::rules(RuleSet { logic: Logic::And, conditions });
        prop_assert_eq!(evaluate_rule(&rule, &user), evaluate_rule(&rule, &user));
    }

    /// Property: Equality ignores the case of both sides
    #[test]
    fn prop_equals_ignores_case(department in "[A-Za-z]{1,16}") {
        let user = UserSnapshot::new(UserId::random()).with_department(&department.to_uppercase());
        let condition = RuleCondition::new(
            ConditionField::Department,
            ConditionOperator::Equals,
            &department.to_lowercase(),
        );
        prop_assert!(evaluate_condition(&condition, &user));
    }

    /// Property: Equals and NotEquals disagree whenever the operand is present
    #[test]
    fn prop_not_equals_negates_equals(user in arb_user(), value in "[A-Za-z ]{0,12}") {
        let equals = RuleCondition::new(ConditionField::Department, ConditionOperator::Equals, &value);
        let not_equals =
            RuleCondition::new(ConditionField::Department, ConditionOperator::NotEquals, &value);
        prop_assert_ne!(
            evaluate_condition(&equals, &user),
            evaluate_condition(&not_equals, &user)
        );
    }

    /// Property: NotMemberOf is the negation of MemberOf for valid group ids
    #[test]
    fn prop_not_member_of_negates_member_of(user in arb_user(), bytes in any::<[u8; 16]>()) {
        let group = GroupId::new(uuid_from(bytes));
        prop_assert_ne!(
            evaluate_condition(&RuleCondition::member_of(group), &user),
            evaluate_condition(&RuleCondition::not_member_of(group), &user)
        );
    }

    /// Property: A group rule matches exactly when the user holds a listed group
    #[test]
    fn prop_groups_rule_is_intersection(
        user in arb_user(),
        listed in prop::collection::btree_set(any::<[u8; 16]>(), 0..4),
    ) {
        let listed: Vec<GroupId> = listed.into_iter().map(|b| GroupId::new(uuid_from(b))).collect();
        let expected = listed.iter().any(|g| user.is_member_of(g));
        prop_assert_eq!(evaluate_rule(&VisibilityRule::groups(listed), &user), expected);
    }
}
