//! The visibility service.
//!
//! Entry point for content and delivery layers. Every operation resolves the
//! requesting user exactly once (directory snapshot plus group memberships)
//! and then evaluates any number of rules against that snapshot without
//! further I/O.

use std::sync::Arc;

use audience_config::AudienceConfig;
use audience_rules::{RuleError, UserSnapshot, VisibilityRule, evaluate_rule};
use audience_types::{MalformedRulePolicy, UserId};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::directory::{GroupMembershipStore, UserDirectory};
use crate::error::{Result, VisibilityError};
use crate::widgets::{self, TreeShape};

// ============================================================================
// Options
// ============================================================================

/// Tunables for [`VisibilityService`], usually derived from [`AudienceConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Outcome for rule payloads that fail to parse.
    pub malformed_rules: MalformedRulePolicy,
    /// Emit a debug event per decision.
    pub audit: bool,
    /// Widget key holding the embedded rule.
    pub visibility_key: String,
    /// Widget keys holding nested widget arrays.
    pub child_keys: Vec<String>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from(&AudienceConfig::default())
    }
}

impl From<&AudienceConfig> for ServiceOptions {
    fn from(config: &AudienceConfig) -> Self {
        Self {
            malformed_rules: config.engine.malformed_rules,
            audit: config.engine.audit,
            visibility_key: config.widgets.visibility_key.clone(),
            child_keys: config.widgets.child_keys.clone(),
        }
    }
}

// ============================================================================
// Gate
// ============================================================================

/// A rule payload after parsing and policy application.
#[derive(Debug)]
enum Gate {
    /// No rule, or a malformed rule under the fail-open policy.
    Open,
    /// A malformed rule under the fail-closed policy.
    Closed,
    Rule(VisibilityRule),
}

impl Gate {
    fn admits(&self, user: &UserSnapshot) -> bool {
        match self {
            Self::Open => true,
            Self::Closed => false,
            Self::Rule(rule) => evaluate_rule(rule, user),
        }
    }
}

// ============================================================================
// Service
// ============================================================================

/// Decides which content a user may see.
///
/// Cheap to clone; clones share collaborators. Bind a per-request
/// cancellation token with [`VisibilityService::with_cancellation`].
#[derive(Debug, Clone)]
pub struct VisibilityService {
    directory: Arc<dyn UserDirectory>,
    memberships: Arc<dyn GroupMembershipStore>,
    options: Arc<ServiceOptions>,
    cancel: CancellationToken,
}

impl VisibilityService {
    /// Creates a service over separate directory and membership collaborators.
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        memberships: Arc<dyn GroupMembershipStore>,
    ) -> Self {
        Self {
            directory,
            memberships,
            options: Arc::new(ServiceOptions::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a service over a collaborator that serves both roles.
    pub fn with_directory<D>(directory: Arc<D>) -> Self
    where
        D: UserDirectory + GroupMembershipStore + 'static,
    {
        Self::new(directory.clone(), directory)
    }

    /// Creates a service configured from [`AudienceConfig`].
    pub fn from_config(
        directory: Arc<dyn UserDirectory>,
        memberships: Arc<dyn GroupMembershipStore>,
        config: &AudienceConfig,
    ) -> Self {
        Self::new(directory, memberships).with_options(ServiceOptions::from(config))
    }

    /// Replaces the service options.
    pub fn with_options(mut self, options: ServiceOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    /// Binds a cancellation token; lookups still outstanding when it fires
    /// are abandoned and the call fails with [`VisibilityError::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Disables per-decision audit events (for testing).
    pub fn without_audit(mut self) -> Self {
        let mut options = (*self.options).clone();
        options.audit = false;
        self.options = Arc::new(options);
        self
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    // ------------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------------

    /// Checks a single rule for a user.
    ///
    /// - Unknown or inactive user: `false` (fail closed).
    /// - `None`, empty or `null` rule: `true`.
    /// - Malformed rule: per [`ServiceOptions::malformed_rules`].
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn is_visible(&self, user_id: UserId, rule_json: Option<&str>) -> Result<bool> {
        let Some(user) = self.resolve(user_id).await? else {
            return Ok(false);
        };

        let visible = self.parse_rule(rule_json).admits(&user);
        if self.options.audit {
            debug!(user_id = %user_id, visible, "Visibility decided");
        }
        Ok(visible)
    }

    /// Keeps the items whose rule (as returned by `rule_of`) admits the user.
    ///
    /// The user is resolved once for the whole collection; input order is
    /// preserved. An unresolvable user sees nothing.
    #[instrument(skip_all, fields(user_id = %user_id, items = items.len()))]
    pub async fn filter_visible<T, F>(
        &self,
        user_id: UserId,
        items: Vec<T>,
        rule_of: F,
    ) -> Result<Vec<T>>
    where
        F: Fn(&T) -> Option<&str>,
    {
        let Some(user) = self.resolve(user_id).await? else {
            return Ok(Vec::new());
        };

        let total = items.len();
        let visible: Vec<T> = items
            .into_iter()
            .filter(|item| self.parse_rule(rule_of(item)).admits(&user))
            .collect();

        if self.options.audit {
            debug!(
                user_id = %user_id,
                total,
                visible = visible.len(),
                "Collection filtered"
            );
        }
        Ok(visible)
    }

    /// Removes widgets the user may not see from a page's content tree.
    ///
    /// `content_json` must be a JSON array of widget nodes. Nodes without an
    /// embedded rule always pass through; retained nodes keep their fields,
    /// key order and position. Filtering its own output again yields the same
    /// document.
    ///
    /// For an unresolvable user, every node carrying a rule is removed and
    /// unrestricted nodes are kept.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn filter_widgets(&self, user_id: UserId, content_json: &str) -> Result<String> {
        let mut nodes =
            widgets::parse_content(content_json).map_err(VisibilityError::InvalidContent)?;
        if nodes.is_empty() {
            return Ok("[]".to_string());
        }

        let user = self.resolve(user_id).await?;
        let shape = TreeShape {
            visibility_key: &self.options.visibility_key,
            child_keys: &self.options.child_keys,
        };
        let allows = |rule: &Value| {
            user.as_ref()
                .is_some_and(|user| self.parse_rule_value(rule).admits(user))
        };

        let removed = widgets::retain_visible(&mut nodes, shape, &allows);

        if self.options.audit {
            debug!(
                user_id = %user_id,
                resolved = user.is_some(),
                removed,
                "Widget tree filtered"
            );
        }
        Ok(Value::Array(nodes).to_string())
    }

    /// Selects the candidates a newsletter (or any audience-targeted send)
    /// should reach.
    ///
    /// The rule is parsed once; each candidate is resolved once. Unresolvable
    /// candidates are skipped. Candidate order is preserved.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn audience_members(
        &self,
        rule_json: Option<&str>,
        candidates: &[UserId],
    ) -> Result<Vec<UserId>> {
        let gate = self.parse_rule(rule_json);
        if matches!(gate, Gate::Closed) {
            return Ok(Vec::new());
        }

        let mut members = Vec::new();
        for &user_id in candidates {
            let Some(user) = self.resolve(user_id).await? else {
                continue;
            };
            if gate.admits(&user) {
                members.push(user_id);
            }
        }

        if self.options.audit {
            debug!(
                candidates = candidates.len(),
                members = members.len(),
                "Audience selected"
            );
        }
        Ok(members)
    }

    // ------------------------------------------------------------------------
    // User resolution
    // ------------------------------------------------------------------------

    /// Resolves the user, racing the lookup against the cancellation token.
    async fn resolve(&self, user_id: UserId) -> Result<Option<UserSnapshot>> {
        tokio::select! {
            biased;

            () = self.cancel.cancelled() => {
                debug!(user_id = %user_id, "User resolution cancelled");
                Err(VisibilityError::Cancelled)
            }
            resolved = self.lookup(user_id) => resolved,
        }
    }

    async fn lookup(&self, user_id: UserId) -> Result<Option<UserSnapshot>> {
        let Some(mut user) = self.directory.snapshot(user_id).await? else {
            debug!(user_id = %user_id, "User not found; failing closed");
            return Ok(None);
        };

        if !user.active {
            debug!(user_id = %user_id, "User inactive; failing closed");
            return Ok(None);
        }

        let groups = self.memberships.group_ids(user_id).await?;
        user.group_ids.extend(groups);
        Ok(Some(user))
    }

    // ------------------------------------------------------------------------
    // Rule parsing
    // ------------------------------------------------------------------------

    fn parse_rule(&self, rule_json: Option<&str>) -> Gate {
        match rule_json.map(str::trim) {
            None | Some("" | "null") => Gate::Open,
            Some(json) => self.gate(VisibilityRule::from_json(json)),
        }
    }

    /// Embedded rules may be inline objects or persisted JSON strings.
    fn parse_rule_value(&self, rule: &Value) -> Gate {
        match rule {
            Value::Null => Gate::Open,
            Value::String(json) => self.parse_rule(Some(json.as_str())),
            other => self.gate(VisibilityRule::from_value(other)),
        }
    }

    fn gate(&self, parsed: std::result::Result<VisibilityRule, RuleError>) -> Gate {
        match parsed {
            Ok(rule) => Gate::Rule(rule),
            Err(e) => {
                let policy = self.options.malformed_rules;
                warn!(error = %e, policy = ?policy, "Malformed visibility rule; applying policy");
                if policy.outcome() {
                    Gate::Open
                } else {
                    Gate::Closed
                }
            }
        }
    }
}
