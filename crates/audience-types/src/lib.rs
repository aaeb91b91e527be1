//! # audience-types: Core types for `audience`
//!
//! Shared types used across the visibility engine:
//! - Entity IDs ([`UserId`], [`GroupId`])
//! - Failure policy for malformed rule data ([`MalformedRulePolicy`])

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Entity IDs
// ============================================================================

/// Error returned when an identifier string is not a valid UUID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} id '{input}'")]
pub struct IdParseError {
    kind: &'static str,
    input: String,
}

impl IdParseError {
    /// The rejected input, verbatim.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Unique identifier for a user of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a random identifier. Intended for tests and fixtures.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for UserId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| IdParseError {
                kind: "user",
                input: s.to_string(),
            })
    }
}

/// Unique identifier for an audience group (team, distribution list, role).
///
/// Groups are referenced from persisted rules in their hyphenated string form,
/// so parsing is lenient about surrounding whitespace and letter case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a random identifier. Intended for tests and fixtures.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for GroupId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for GroupId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| IdParseError {
                kind: "group",
                input: s.to_string(),
            })
    }
}

// ============================================================================
// Malformed Rule Policy
// ============================================================================

/// How a rule payload that cannot be parsed is treated.
///
/// Missing *users* always fail closed. Missing or corrupt *rule data* fails
/// open by default so that a damaged rule never hides content from everyone;
/// deployments that prefer the opposite trade-off select `FailClosed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedRulePolicy {
    /// Treat the rule as unrestricted (visible to every resolvable user).
    #[default]
    FailOpen,
    /// Treat the rule as unsatisfiable (hidden from everyone).
    FailClosed,
}

impl MalformedRulePolicy {
    /// Visibility outcome applied when a rule cannot be parsed.
    pub fn outcome(self) -> bool {
        match self {
            Self::FailOpen => true,
            Self::FailClosed => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
