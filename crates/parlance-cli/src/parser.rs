//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Streamed text-to-speech audio player.
#[derive(Parser)]
#[command(name = "parlance")]
#[command(about = "Play and inspect streamed text-to-speech audio")]
#[command(version)]
pub struct Cli {
    /// Playback config file (JSON); missing fields use defaults
    #[arg(long = "config", global = true, env = "PARLANCE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["parlance", "--verbose", "--config", "/tmp/parlance.json", "config"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/parlance.json")));
        assert!(matches!(cli.command, Some(Commands::Config)));
    }
}
