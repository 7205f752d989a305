//! tether CLI entry point.

use anyhow::Result;
use clap::Parser;

use tether::cli::{commands, handle_error, Cli, Commands};
use tether::infrastructure::config::ConfigLoader;
use tether::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(&err, json_mode);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Profile(args) => commands::profile::execute(args, &config, cli.json).await,
        Commands::Chat(args) => commands::chat::execute(args, &config, cli.json).await,
        Commands::Models(args) => commands::models::execute(args, &config, cli.json).await,
    }
}
