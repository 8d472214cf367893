//! Command-line interface for the `attendlink` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ComposeCommand, ConfigCommand, LinkCommand, NotifyCommand, PhoneCommand, RecordCommand,
    StatusCommand, StudentCommand, VerifyCommand,
};

use crate::logging::Verbosity;

/// attendlink - Signed guardian links and attendance follow-ups
///
/// Mints capability links to a student's read-only page, validates guardian
/// numbers and sends the weekly follow-up message through the desktop's
/// message app, recording whether each attempt got through.
#[derive(Debug, Parser)]
#[command(name = "attendlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the capability link for a student
    Link(LinkCommand),

    /// Check a signature or a capability link
    Verify(VerifyCommand),

    /// Validate and normalize a guardian number
    Phone(PhoneCommand),

    /// Print a follow-up message without sending it
    Compose(ComposeCommand),

    /// Send a follow-up message and record the outcome
    Notify(NotifyCommand),

    /// Set a week's delivery flag by hand
    Record(RecordCommand),

    /// Manage student records
    #[command(subcommand)]
    Student(StudentCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), "attendlink");
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["attendlink", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["attendlink", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["attendlink", "-vv", "status"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["attendlink", "-q", "status"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_link() {
        let cli = parse(&["attendlink", "link", "42", "--origin", "https://a.example"]);
        let Command::Link(cmd) = cli.command else {
            panic!("expected link");
        };
        assert_eq!(cmd.id, "42");
        assert_eq!(cmd.origin.as_deref(), Some("https://a.example"));
    }

    #[test]
    fn test_parse_verify_forms() {
        let cli = parse(&["attendlink", "verify", "42", "abc"]);
        assert!(matches!(cli.command, Command::Verify(VerifyCommand { url: None, .. })));

        let cli = parse(&["attendlink", "verify", "--url", "/student-info?id=1&sig=a"]);
        assert!(matches!(cli.command, Command::Verify(VerifyCommand { id: None, .. })));

        assert!(Cli::try_parse_from(["attendlink", "verify"]).is_err());
        assert!(Cli::try_parse_from(["attendlink", "verify", "42"]).is_err());
    }

    #[test]
    fn test_parse_notify_defaults_to_week_one() {
        let Command::Notify(cmd) = parse(&["attendlink", "notify", "42"]).command else {
            panic!("expected notify");
        };
        assert_eq!(cmd.week.get(), 1);
        assert!(!cmd.no_open);
    }

    #[test]
    fn test_parse_week_zero_is_rejected() {
        assert!(Cli::try_parse_from(["attendlink", "compose", "42", "--week", "0"]).is_err());
    }

    #[test]
    fn test_parse_week_past_term_is_rejected() {
        for args in [
            ["attendlink", "record", "42", "--week", "4000000000", "--delivered"].as_slice(),
            ["attendlink", "notify", "42", "--week", "53"].as_slice(),
        ] {
            assert!(Cli::try_parse_from(args).is_err());
        }
    }

    #[test]
    fn test_parse_record_requires_state() {
        assert!(Cli::try_parse_from(["attendlink", "record", "42"]).is_err());
        assert!(
            Cli::try_parse_from(["attendlink", "record", "42", "--delivered", "--failed"]).is_err()
        );

        let Command::Record(cmd) = parse(&["attendlink", "record", "42", "-w", "2", "--failed"])
            .command
        else {
            panic!("expected record");
        };
        assert_eq!(cmd.week.get(), 2);
        assert!(cmd.failed);
    }

    #[test]
    fn test_parse_student_import() {
        let cli = parse(&["attendlink", "student", "import", "students.json"]);
        assert!(matches!(
            cli.command,
            Command::Student(StudentCommand::Import { .. })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["attendlink", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
