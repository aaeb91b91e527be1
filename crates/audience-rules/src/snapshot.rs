//! User snapshot used during rule evaluation.
//!
//! A snapshot is the read-only bundle of profile attributes and group ids
//! describing one user at evaluation time. It is resolved once per request
//! by the caller and shared by every condition and every item evaluated
//! against it.

use std::collections::BTreeSet;

use audience_types::{GroupId, UserId};
use serde::{Deserialize, Serialize};

use crate::rule::ConditionField;

/// Attributes describing the user content is being targeted at.
///
/// Every string attribute is optional: directory records are frequently
/// incomplete, and a missing attribute simply never equals a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub user_id: UserId,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    /// Groups the user belongs to.
    #[serde(default)]
    pub group_ids: BTreeSet<GroupId>,
    /// `false` for deleted or deactivated accounts.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl UserSnapshot {
    /// Creates an active snapshot with no attributes and no groups.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            department: None,
            location: None,
            job_title: None,
            preferred_language: None,
            group_ids: BTreeSet::new(),
            active: true,
        }
    }

    /// Sets the department.
    pub fn with_department(mut self, department: &str) -> Self {
        self.department = Some(department.to_string());
        self
    }

    /// Sets the location.
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    /// Sets the job title.
    pub fn with_job_title(mut self, job_title: &str) -> Self {
        self.job_title = Some(job_title.to_string());
        self
    }

    /// Sets the preferred language.
    pub fn with_preferred_language(mut self, language: &str) -> Self {
        self.preferred_language = Some(language.to_string());
        self
    }

    /// Adds a single group membership.
    pub fn with_group(mut self, group: GroupId) -> Self {
        self.group_ids.insert(group);
        self
    }

    /// Replaces the group set.
    pub fn with_groups<I: IntoIterator<Item = GroupId>>(mut self, groups: I) -> Self {
        self.group_ids = groups.into_iter().collect();
        self
    }

    /// Marks the account as deleted or deactivated.
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns the string attribute named by `field`.
    ///
    /// `Group` and `Unknown` are not string attributes and always yield `None`.
    pub fn attribute(&self, field: ConditionField) -> Option<&str> {
        match field {
            ConditionField::Department => self.department.as_deref(),
            ConditionField::Location => self.location.as_deref(),
            ConditionField::JobTitle => self.job_title.as_deref(),
            ConditionField::PreferredLanguage => self.preferred_language.as_deref(),
            ConditionField::Group | ConditionField::Unknown => None,
        }
    }

    pub fn is_member_of(&self, group: &GroupId) -> bool {
        self.group_ids.contains(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let group = GroupId::random();
        let user = UserSnapshot::new(UserId::random())
            .with_department("Engineering")
            .with_location("New York")
            .with_job_title("Staff Engineer")
            .with_preferred_language("en")
            .with_group(group);

        assert_eq!(user.attribute(ConditionField::Department), Some("Engineering"));
        assert_eq!(user.attribute(ConditionField::Location), Some("New York"));
        assert_eq!(user.attribute(ConditionField::JobTitle), Some("Staff Engineer"));
        assert_eq!(user.attribute(ConditionField::PreferredLanguage), Some("en"));
        assert!(user.is_member_of(&group));
        assert!(user.active);
    }

    #[test]
    fn test_non_string_fields_have_no_attribute() {
        let user = UserSnapshot::new(UserId::random()).with_group(GroupId::random());
        assert_eq!(user.attribute(ConditionField::Group), None);
        assert_eq!(user.attribute(ConditionField::Unknown), None);
        assert_eq!(user.attribute(ConditionField::Department), None);
    }

    #[test]
    fn test_deserialize_sparse_record() {
        let user: UserSnapshot =
            serde_json::from_str(r#"{"user_id":"00000000-0000-0000-0000-000000000007"}"#).unwrap();
        assert!(user.active);
        assert!(user.group_ids.is_empty());
        assert_eq!(user.department, None);
    }
}
