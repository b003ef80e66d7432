//! cmdstash - command-snippet manager CLI
//!
#![doc = "cmdstash - command-snippet manager CLI"]
#![doc = "Main entry point for the cmdstash application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cmdstash::cli::Cli;
use cmdstash::commands;
use cmdstash::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    tracing::debug!("Using backend at {}", config.api.base_url);
    commands::run(config, cli.command).await
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("cmdstash=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cmdstash=info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
