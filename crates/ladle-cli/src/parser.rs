//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the ladle voice pipeline.
#[derive(Parser)]
#[command(name = "ladle")]
#[command(about = "Narrate recipes through the ladle voice pipeline")]
#[command(version)]
pub struct Cli {
    /// JSON settings file (every field optional)
    #[arg(long = "settings", env = "LADLE_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    /// Override the synthesis endpoint for this invocation
    #[arg(long = "endpoint", global = true)]
    pub endpoint: Option<String>,

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
        let cli = Cli::parse_from([
            "ladle",
            "--verbose",
            "--endpoint",
            "https://tts.example.com/v1/speak",
            "settings",
        ]);
        assert!(cli.verbose);
        assert_eq!(
            cli.endpoint.as_deref(),
            Some("https://tts.example.com/v1/speak")
        );
        assert!(matches!(cli.command, Some(Commands::Settings)));
    }

    #[test]
    fn test_no_command_is_allowed() {
        let cli = Cli::parse_from(["ladle"]);
        assert!(cli.command.is_none());
    }
}
