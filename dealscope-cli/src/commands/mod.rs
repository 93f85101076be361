//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod load;
mod result;
mod status;

pub use result::SortKey;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start a report (or reuse the cached one) and wait for its results
    Load {
        /// Start a new job even when results are cached
        #[arg(long)]
        bypass_cache: bool,

        /// Print the job id and return without waiting
        #[arg(long)]
        no_wait: bool,

        /// Progress polling interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
    /// Show the progress of a job
    Status {
        /// Job ID
        id: String,
    },
    /// Show the report rows of a completed job
    Result {
        /// Job ID, or `cached` for the cached report
        id: String,

        /// Only keep rows whose country or program contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Column to sort by
        #[arg(long, value_enum, default_value_t = SortKey::Count)]
        sort: SortKey,

        /// Reverse the sort direction
        #[arg(short, long)]
        reverse: bool,

        /// Print the rows as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Load {
            bypass_cache,
            no_wait,
            interval_ms,
        } => load::handle_load_command(config, bypass_cache, no_wait, interval_ms).await,
        Commands::Status { id } => status::handle_status_command(config, &id).await,
        Commands::Result {
            id,
            search,
            sort,
            reverse,
            json,
        } => {
            let view = result::TableView {
                search,
                sort,
                reverse,
            };
            result::handle_result_command(config, &id, &view, json).await
        }
    }
}
