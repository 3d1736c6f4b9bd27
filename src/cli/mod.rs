//! Command-line interface for the cockpit agent.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::models::DrivingState;

#[derive(Parser, Debug)]
#[command(name = "cockpit-agent", version, about = "In-vehicle voice assistant orchestrator")]
pub struct Cli {
    /// Emit machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .cockpit/config.yaml + local.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an utterance through the full pipeline
    Ask(commands::ask::AskArgs),
    /// Classify an utterance without executing anything
    Classify(commands::classify::ClassifyArgs),
    /// Classify an utterance and report the safety verdict
    Check(commands::check::CheckArgs),
}

/// Parse `parked`, `driving` or `highway` (case-insensitive).
pub fn parse_driving_state(s: &str) -> Result<DrivingState, String> {
    DrivingState::from_str(s)
        .ok_or_else(|| format!("invalid driving state '{s}' (expected parked, driving or highway)"))
}

/// Print a command error and exit with status 1.
pub fn handle_error(err: anyhow::Error, json: bool) -> ! {
    if json {
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_driving_state() {
        assert_eq!(parse_driving_state("Highway"), Ok(DrivingState::Highway));
        assert!(parse_driving_state("flying").is_err());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
