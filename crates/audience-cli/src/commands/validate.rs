//! Validate command - reports authoring problems in a rule.

use anyhow::{Context, Result};
use audience_rules::VisibilityRule;

use super::read_rule;

pub fn run(rule_arg: &str) -> Result<()> {
    let json = read_rule(rule_arg)?;
    let rule = VisibilityRule::from_json(&json).context("Rule is not well-formed")?;

    let issues = rule.validate();
    if issues.is_empty() {
        println!("Rule is valid");
        return Ok(());
    }

    for issue in &issues {
        println!("  - {issue}");
    }
    anyhow::bail!("Rule has {} problem(s)", issues.len())
}
