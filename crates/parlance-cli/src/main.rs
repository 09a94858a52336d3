//! CLI entry point - the composition root.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use parlance_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::load(cli.config.as_deref())?;

    match command {
        Commands::Play(args) => {
            let service = bootstrap(config)?;
            handlers::play::execute(service, args).await?;
        }
        Commands::Inspect(args) => {
            handlers::inspect::execute(&config, &args).await?;
        }
        Commands::Config => {
            handlers::config::execute(&config)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables before parsing so `PARLANCE_CONFIG` can come from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
