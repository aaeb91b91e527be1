//! Check command - decides visibility of one rule for one user.

use std::path::Path;

use anyhow::Result;
use audience_config::AudienceConfig;

use super::{block_on, build_service, load_directory, parse_user, read_rule};

pub fn run(
    config: &AudienceConfig,
    directory: &Path,
    user: &str,
    rule_arg: Option<&str>,
) -> Result<()> {
    let user_id = parse_user(user)?;
    let rule = rule_arg.map(read_rule).transpose()?;
    let service = build_service(config, load_directory(directory)?);

    let visible = block_on(service.is_visible(user_id, rule.as_deref()))??;
    println!("{}", if visible { "visible" } else { "hidden" });
    Ok(())
}
