mod cli;
mod config;
mod display;
mod error;
mod mal;
mod mcp;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::Cli;
use crate::config::Config;
use crate::error::Result;
use crate::mal::{HttpTransport, MalClient, Transport};

fn env_filter(verbose: bool) -> EnvFilter {
    let directive = if verbose { "zutto=debug" } else { "zutto=info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

// stdout carries MCP traffic, so logs go to a file in the data dir.
fn setup_logging(verbose: bool) -> Result<()> {
    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let file_appender = tracing_appender::rolling::daily(&data_dir, "zutto.log");

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .init();

    Ok(())
}

fn build_client(config: &Config, client_id: Option<String>) -> Result<MalClient> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.api.timeout())?);
    let client_id = client_id.or_else(|| config.client_id());

    let client = MalClient::new(Some(transport), client_id)?.with_base_url(&config.api.base_url);
    debug!(base_url = client.base_url(), "MAL client ready");
    Ok(client)
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let client = build_client(&config, cli.client_id)?;
    cli::run(cli.command, client).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        tracing_subscriber::registry()
            .with(env_filter(cli.verbose))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        warn!("Could not set up file logging: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
