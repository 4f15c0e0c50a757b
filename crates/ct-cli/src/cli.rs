//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::start::StartArgs;

/// Countdown timer with an append-only session log.
///
/// Every start, stop, finish and acknowledgement is recorded; past sessions
/// and tag suggestions are derived from that log.
#[derive(Debug, Parser)]
#[command(name = "ct", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a new countdown.
    Start(StartArgs),

    /// Show the active countdown.
    Status,

    /// Follow the active countdown until it finishes or is stopped.
    Watch,

    /// Stop the active countdown early.
    Stop,

    /// Acknowledge a finished countdown.
    Ack,

    /// List past sessions, most recent first.
    Sessions {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List every tag used so far.
    Tags,

    /// Write the event log to stdout as CSV.
    Export,

    /// Append the events of a CSV log file.
    Import {
        /// CSV file with the exported column layout.
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_start_with_repeated_and_joined_tags() {
        let cli = Cli::parse_from([
            "ct",
            "start",
            "Write report",
            "-t",
            "work",
            "--tag",
            "docs",
            "--tags",
            "urgent, q3",
            "-m",
            "1h30m",
        ]);
        let Some(Commands::Start(args)) = cli.command else {
            panic!("expected start command");
        };
        assert_eq!(args.title, "Write report");
        assert_eq!(args.tag, ["work", "docs"]);
        assert_eq!(args.tags.as_deref(), Some("urgent, q3"));
        assert_eq!(args.minutes.as_deref(), Some("1h30m"));
        assert!(args.description.is_none());
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::parse_from(["ct", "sessions", "--json", "-v", "--config", "ct.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("ct.toml")));
        assert!(matches!(cli.command, Some(Commands::Sessions { json: true })));
    }
}
