//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "agendacx", about = "Conversational scheduling assistant", version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the assistant reading "chat_id: message" lines from stdin
    Run,
    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_run_with_config() {
        let cli = Cli::parse_from(["agendacx", "-v", "--config", "conf.yml", "run"]);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("conf.yml")));
        assert!(matches!(cli.command, Some(Command::Run)));
    }

    #[test]
    fn test_defaults_to_no_subcommand() {
        let cli = Cli::parse_from(["agendacx"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }
}
