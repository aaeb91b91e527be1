//! Collaborator interfaces for resolving users.
//!
//! The engine does not own user or group data. It consumes it through the
//! [`UserDirectory`] and [`GroupMembershipStore`] traits, which the host
//! platform implements over its own persistence. [`InMemoryDirectory`]
//! implements both for tests, fixtures and the CLI.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;

use async_trait::async_trait;
use audience_rules::UserSnapshot;
use audience_types::{GroupId, UserId};
use thiserror::Error;

/// Error type for collaborator lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The backing store could not be reached or answered with an error.
    #[error("User directory unavailable: {0}")]
    Unavailable(String),

    /// Group membership could not be loaded for a resolved user.
    #[error("Group membership lookup failed for user {user_id}: {reason}")]
    MembershipLookup { user_id: UserId, reason: String },

    /// Directory records could not be decoded.
    #[error("Invalid directory data: {0}")]
    InvalidData(#[from] serde_json::Error),
}

/// Source of user profile snapshots.
///
/// Returns `Ok(None)` for users the directory does not know. Deleted users
/// may either be omitted or returned with `active == false`; the service
/// treats both as unresolvable.
#[async_trait]
pub trait UserDirectory: Send + Sync + Debug {
    async fn snapshot(&self, user_id: UserId) -> Result<Option<UserSnapshot>, DirectoryError>;
}

/// Source of group memberships.
///
/// Implementations that already fold groups into [`UserDirectory::snapshot`]
/// may return an empty set; the service merges both.
#[async_trait]
pub trait GroupMembershipStore: Send + Sync + Debug {
    async fn group_ids(&self, user_id: UserId) -> Result<BTreeSet<GroupId>, DirectoryError>;
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// A directory held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: HashMap<UserId, UserSnapshot>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user (builder pattern). Replaces an existing user with the same id.
    pub fn with_user(mut self, user: UserSnapshot) -> Self {
        self.insert(user);
        self
    }

    pub fn insert(&mut self, user: UserSnapshot) {
        self.users.insert(user.user_id, user);
    }

    /// Loads a directory from a JSON array of user snapshots.
    ///
    /// ```
    /// use audience_visibility::InMemoryDirectory;
    ///
    /// let directory = InMemoryDirectory::from_json(r#"[
    ///     {"user_id": "00000000-0000-0000-0000-000000000001", "department": "Engineering"}
    /// ]"#).unwrap();
    /// assert_eq!(directory.len(), 1);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let users: Vec<UserSnapshot> = serde_json::from_str(json)?;
        Ok(users.into_iter().fold(Self::new(), Self::with_user))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// User ids in ascending order.
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.users.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn snapshot(&self, user_id: UserId) -> Result<Option<UserSnapshot>, DirectoryError> {
        Ok(self.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl GroupMembershipStore for InMemoryDirectory {
    async fn group_ids(&self, user_id: UserId) -> Result<BTreeSet<GroupId>, DirectoryError> {
        Ok(self
            .users
            .get(&user_id)
            .map(|user| user.group_ids.clone())
            .unwrap_or_default())
    }
}
