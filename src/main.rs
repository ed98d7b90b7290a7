use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use log::{error, info};
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};
use tagrade::config::Config;
use tagrade::server::{serve, AppState};

// Entry point for the async main function, powered by tokio runtime.
#[tokio::main]
async fn main() {
    // Loads environment variables from a `.env` file, if present.
    dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {:#}", e);
            return;
        }
    };

    // Initializes logging with simplelog to the terminal with mixed output and automatic color support.
    if let Err(e) = TermLogger::init(
        config.log_level,
        LogConfig::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    if let Err(e) = run(config).await {
        error!("Server stopped: {:#}", e);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config).context("Failed to build the portal client")?;
    info!("Using portal at {}", state.portal.portal_url());

    serve(config.port, Arc::new(state))
        .await
        .context("Failed to run the HTTP server")
}
