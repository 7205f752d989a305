//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{chat::ChatArgs, models::ModelsArgs, profile::ProfileArgs};

#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "Cached document repositories and an OpenRouter client")]
pub struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file; defaults to .tether/config.yaml plus .tether/local.yaml
    #[arg(long, global = true, env = "TETHER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect and edit stored player profiles
    Profile(ProfileArgs),
    /// Send a chat completion
    Chat(ChatArgs),
    /// List models known to the API
    Models(ModelsArgs),
}

/// Print a command failure and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
