//! bbx - Bitbucket branch helper CLI
//!
//! Main entry point: initializes tracing, loads configuration, and
//! dispatches the authentication commands.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bbx::cli::{Cli, Commands};
use bbx::commands;
use bbx::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Login => {
            tracing::info!("starting browser login flow");
            commands::auth::run_login(&config).await
        }
        Commands::Logout => commands::auth::run_logout(),
        Commands::Status => commands::auth::run_status(),
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "bbx=debug" } else { "bbx=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
