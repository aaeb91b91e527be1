//! Audience command - lists the users a rule reaches, one id per line.

use std::path::Path;

use anyhow::Result;
use audience_config::AudienceConfig;
use audience_types::UserId;

use super::{block_on, build_service, load_directory, parse_user, read_rule};

pub fn run(
    config: &AudienceConfig,
    directory: &Path,
    rule_arg: Option<&str>,
    candidates: &[String],
) -> Result<()> {
    let rule = rule_arg.map(read_rule).transpose()?;
    let directory = load_directory(directory)?;

    let candidates: Vec<UserId> = if candidates.is_empty() {
        directory.user_ids()
    } else {
        candidates
            .iter()
            .map(|c| parse_user(c))
            .collect::<Result<_>>()?
    };

    let service = build_service(config, directory);
    let members = block_on(service.audience_members(rule.as_deref(), &candidates))??;

    tracing::info!(
        candidates = candidates.len(),
        members = members.len(),
        "Audience resolved"
    );
    for member in members {
        println!("{member}");
    }
    Ok(())
}
