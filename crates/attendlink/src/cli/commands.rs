//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::record::WeekNumber;

/// Parse a one-based week number.
fn parse_week(value: &str) -> Result<WeekNumber, String> {
    value.parse().map_err(|e: crate::Error| e.to_string())
}

/// `link` arguments.
#[derive(Debug, Args)]
pub struct LinkCommand {
    /// Student id
    pub id: String,

    /// Origin to resolve the link against (defaults to `links.default_origin`)
    #[arg(short, long, value_name = "URL")]
    pub origin: Option<String>,
}

/// `verify` arguments.
#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Student id
    #[arg(required_unless_present = "url", requires = "signature")]
    pub id: Option<String>,

    /// Signature to check
    pub signature: Option<String>,

    /// Check a whole capability link instead
    #[arg(long, value_name = "URL", conflicts_with_all = ["id", "signature"])]
    pub url: Option<String>,
}

/// `phone` arguments.
#[derive(Debug, Args)]
pub struct PhoneCommand {
    /// Guardian number as typed
    pub raw: String,
}

/// `compose` arguments.
#[derive(Debug, Args)]
pub struct ComposeCommand {
    /// Student id
    pub id: String,

    /// Week to report on
    #[arg(short, long, default_value = "1", value_parser = parse_week)]
    pub week: WeekNumber,

    /// Origin for the embedded capability link
    #[arg(short, long, value_name = "URL")]
    pub origin: Option<String>,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// `notify` arguments.
#[derive(Debug, Args)]
pub struct NotifyCommand {
    /// Student id
    pub id: String,

    /// Week to report on
    #[arg(short, long, default_value = "1", value_parser = parse_week)]
    pub week: WeekNumber,

    /// Origin for the embedded capability link
    #[arg(short, long, value_name = "URL")]
    pub origin: Option<String>,

    /// Print the deep link instead of opening it
    #[arg(long)]
    pub no_open: bool,

    /// Output the full report as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// `record` arguments.
#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("state").required(true).args(["delivered", "failed"])))]
pub struct RecordCommand {
    /// Student id
    pub id: String,

    /// Week to update
    #[arg(short, long, default_value = "1", value_parser = parse_week)]
    pub week: WeekNumber,

    /// Mark the week's message as delivered
    #[arg(long)]
    pub delivered: bool,

    /// Mark the week's message as failed
    #[arg(long)]
    pub failed: bool,
}

/// Student record commands.
#[derive(Debug, Subcommand)]
pub enum StudentCommand {
    /// Import students from a JSON file (one object or an array)
    Import {
        /// File to import
        file: PathBuf,
    },

    /// Show one student
    Show {
        /// Student id
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List all students
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration (secret redacted)
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
