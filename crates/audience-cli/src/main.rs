//! Audience command-line tool.
//!
//! Checks visibility rules against a JSON user directory without a running
//! platform. Useful for authoring rules and reproducing visibility reports.
//!
//! # Quick Start
//!
//! ```bash
//! # Check a rule for authoring mistakes
//! audience validate '{"type":"groups","groupIds":[]}'
//!
//! # Would this user see the content?
//! audience check --directory users.json --user 7f6c... --rule @rule.json
//!
//! # Strip hidden widgets from a page
//! audience filter-widgets --directory users.json --user 7f6c... --content page.json
//!
//! # Who receives a newsletter?
//! audience audience --directory users.json --rule @rule.json
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use audience_config::{AudienceConfig, ConfigLoader, MalformedRulePolicy};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Audience - per-user visibility rules for content and newsletters.
#[derive(Parser)]
#[command(name = "audience")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Read configuration from this TOML file instead of the usual locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hide content whose rule cannot be parsed.
    #[arg(long, global = true)]
    fail_closed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report authoring problems in a rule.
    Validate {
        /// Rule JSON, or @path to read it from a file.
        rule: String,
    },

    /// Decide whether one user may see content guarded by a rule.
    Check {
        /// JSON file holding an array of user records.
        #[arg(short, long)]
        directory: PathBuf,

        /// User id to check.
        #[arg(short, long)]
        user: String,

        /// Rule JSON, or @path. Omit for unrestricted content.
        #[arg(short, long)]
        rule: Option<String>,
    },

    /// Remove widgets a user may not see from page content.
    FilterWidgets {
        /// JSON file holding an array of user records.
        #[arg(short, long)]
        directory: PathBuf,

        /// User id viewing the page.
        #[arg(short, long)]
        user: String,

        /// JSON file holding the page's widget array.
        #[arg(short, long)]
        content: PathBuf,
    },

    /// List the users a rule reaches.
    Audience {
        /// JSON file holding an array of user records.
        #[arg(short, long)]
        directory: PathBuf,

        /// Rule JSON, or @path. Omit to reach every active user.
        #[arg(short, long)]
        rule: Option<String>,

        /// Restrict to these user ids (defaults to the whole directory).
        #[arg(long = "candidate", value_name = "USER")]
        candidates: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AudienceConfig::from_toml_file(path)?,
        None => ConfigLoader::new().load()?,
    };
    if cli.fail_closed {
        config.engine.malformed_rules = MalformedRulePolicy::FailClosed;
    }

    // RUST_LOG wins over the configured filter. Logs go to stderr so
    // command output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Validate { rule } => commands::validate::run(&rule),
        Commands::Check {
            directory,
            user,
            rule,
        } => commands::check::run(&config, &directory, &user, rule.as_deref()),
        Commands::FilterWidgets {
            directory,
            user,
            content,
        } => commands::filter::run(&config, &directory, &user, &content),
        Commands::Audience {
            directory,
            rule,
            candidates,
        } => commands::audience::run(&config, &directory, rule.as_deref(), &candidates),
    }
}
