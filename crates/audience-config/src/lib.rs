//! Configuration management for audience
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (AUD_* prefix, highest precedence)
//! 2. audience.local.toml (gitignored, local overrides)
//! 3. audience.toml (git-tracked, project config)
//! 4. ~/.config/audience/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use audience_types::MalformedRulePolicy;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main audience configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudienceConfig {
    pub engine: EngineConfig,
    pub widgets: WidgetConfig,
    pub logging: LoggingConfig,
}

/// Rule evaluation behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Outcome for rule payloads that fail to parse.
    pub malformed_rules: MalformedRulePolicy,
    /// Emit a debug event for every visibility decision.
    pub audit: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            malformed_rules: MalformedRulePolicy::FailOpen,
            audit: true,
        }
    }
}

/// Shape of page content trees
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Widget key holding the embedded visibility rule.
    pub visibility_key: String,
    /// Widget keys holding nested widget arrays, filtered recursively.
    pub child_keys: Vec<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            visibility_key: "visibility".to_string(),
            child_keys: vec!["children".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"info,audience_rules=debug"`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AudienceConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Load a single TOML file, bypassing layered discovery
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration that hides content whose rule is unreadable
    pub fn strict() -> Self {
        Self {
            engine: EngineConfig {
                malformed_rules: MalformedRulePolicy::FailClosed,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Check cross-field constraints the type system cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = self.widgets.visibility_key.trim();
        if key.is_empty() {
            return Err(ConfigError::ValidationError(
                "widgets.visibility_key must not be empty".to_string(),
            ));
        }
        if self.widgets.child_keys.iter().any(|k| k == key) {
            return Err(ConfigError::ValidationError(format!(
                "widgets.child_keys must not contain the visibility key '{key}'"
            )));
        }
        Ok(())
    }
}
