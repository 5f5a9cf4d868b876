//! CLI entry point: the composition root.
//!
//! Loads `.env`, initialises logging, bootstraps the context and dispatches
//! to a handler. Errors are reported on stderr with a sysexits-style code.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use ladle_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::load(cli.settings.as_deref(), cli.endpoint)?;
    let ctx = bootstrap(config)?;

    match command {
        Commands::Synthesize { text, out, voice } => {
            handlers::synthesize::execute(&ctx, &text, &out, &voice).await?;
        }
        Commands::Narrate { text, voice } => {
            handlers::narrate::execute(&ctx, &text, &voice).await?;
        }
        Commands::Settings => handlers::settings::execute(&ctx)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        tracing::debug!(?err, "Command failed");
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
    Ok(())
}
