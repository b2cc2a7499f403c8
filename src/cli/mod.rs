//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the
//! nuage-events binary.

use clap::{Parser, Subcommand};

/// Tail the event feed of an XREST API.
#[derive(Parser, Debug)]
#[command(name = "nuage-events", about = "XREST API push center CLI", version)]
pub struct Cli {
    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Authenticate and print the root resource.
    Whoami,

    /// Print events as they arrive, until interrupted.
    Events {
        /// Only print events about this entity type (REST name).
        #[arg(long)]
        entity: Option<String>,

        /// Seconds to wait after a failed poll.
        #[arg(long, default_value = "1")]
        retry_delay: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_events() {
        let cli = Cli::try_parse_from([
            "nuage-events",
            "--json",
            "events",
            "--entity",
            "enterprise",
            "--retry-delay",
            "5",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Command::Events {
                entity,
                retry_delay,
            } => {
                assert_eq!(entity.as_deref(), Some("enterprise"));
                assert_eq!(retry_delay, 5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_whoami() {
        let cli = Cli::try_parse_from(["nuage-events", "whoami"]).unwrap();
        assert!(!cli.json);
        assert!(matches!(cli.command, Command::Whoami));
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(Cli::try_parse_from(["nuage-events"]).is_err());
    }
}
