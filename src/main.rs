use anyhow::Result;
use clap::Parser;

mod agent;
mod cli;
mod commands;
mod config;
mod constants;
mod embedding;
mod formatting;
mod ingest;
mod llm;
mod logging;
mod pipeline;
mod reader;
mod router;
mod server;
mod session;
mod storage;
mod store;
mod websearch;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    // Server mode logs to rotated files as well as the console
    match &cli.command {
        Commands::Serve => {
            let log_dir = logging::init_server_logging()?;
            tracing::info!(log_dir = %log_dir.display(), "File logging enabled");
        }
        _ => logging::init_cli_logging(),
    }

    // Load configuration
    let config = Config::load()?;

    // Execute the command
    if let Err(e) = commands::execute(&config, cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
