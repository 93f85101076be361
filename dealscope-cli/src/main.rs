//! Dealscope CLI
//!
//! Command-line interface for the Dealscope report server.

mod api;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "dealscope")]
#[command(about = "Lost deals report CLI", long_about = None)]
struct Cli {
    /// Report server URL
    #[arg(long, env = "DEALSCOPE_SERVER_URL", default_value = "http://localhost:3000")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
    };

    handle_command(cli.command, &config).await
}
