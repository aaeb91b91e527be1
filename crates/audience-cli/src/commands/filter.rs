//! Filter-widgets command - prints a page's widget array as the user sees it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use audience_config::AudienceConfig;

use super::{block_on, build_service, load_directory, parse_user};

pub fn run(config: &AudienceConfig, directory: &Path, user: &str, content: &Path) -> Result<()> {
    let user_id = parse_user(user)?;
    let content_json = fs::read_to_string(content)
        .with_context(|| format!("Failed to read page content {}", content.display()))?;
    let service = build_service(config, load_directory(directory)?);

    let filtered = block_on(service.filter_widgets(user_id, &content_json))??;
    println!("{filtered}");
    Ok(())
}
