//! CLI command implementations.

pub mod audience;
pub mod check;
pub mod filter;
pub mod validate;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use audience_config::AudienceConfig;
use audience_types::UserId;
use audience_visibility::{InMemoryDirectory, VisibilityService};

/// Resolves a rule argument: `@path` reads the file, anything else is the
/// rule itself.
pub fn read_rule(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read rule file {path}"))
        }
        None => Ok(arg.to_string()),
    }
}

pub fn parse_user(arg: &str) -> Result<UserId> {
    arg.parse()
        .with_context(|| format!("'{arg}' is not a valid user id"))
}

pub fn load_directory(path: &Path) -> Result<InMemoryDirectory> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read user directory {}", path.display()))?;
    InMemoryDirectory::from_json(&json)
        .with_context(|| format!("Failed to load user directory {}", path.display()))
}

pub fn build_service(config: &AudienceConfig, directory: InMemoryDirectory) -> VisibilityService {
    let directory = Arc::new(directory);
    VisibilityService::from_config(directory.clone(), directory, config)
}

/// Drives a service future to completion on a single-threaded runtime.
pub fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
