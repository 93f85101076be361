//! Load command handler
//!
//! Starts a report job and follows it until it finishes.

use std::time::Duration;

use anyhow::Result;
use colored::*;
use dealscope_core::domain::job::JobStatus;

use crate::api::ApiClient;
use crate::commands::result::{TableView, print_results};
use crate::commands::status::progress_line;
use crate::config::Config;

/// Request a report and print it once available
pub async fn handle_load_command(
    config: &Config,
    bypass_cache: bool,
    no_wait: bool,
    interval_ms: u64,
) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let response = client.load(bypass_cache).await?;

    if response.cached {
        println!("{}", "Serving cached results".yellow());
        println!();
        let results = response.results.unwrap_or_default();
        print_results(&TableView::default().apply(results));
        return Ok(());
    }

    let job_id = response.job_id;
    println!("{} Started job {}", "✓".green(), job_id.cyan());

    if no_wait {
        println!(
            "{}",
            format!("  Check progress with: dealscope status {}", job_id).dimmed()
        );
        return Ok(());
    }

    let interval = Duration::from_millis(interval_ms.max(50));
    let mut last_line = String::new();

    loop {
        let progress = client.progress(&job_id).await?;

        let line = progress_line(&progress);
        if line != last_line {
            println!("  {} {}", "▸".cyan(), line);
            last_line = line;
        }

        match progress.status {
            JobStatus::InProgress => tokio::time::sleep(interval).await,
            JobStatus::Completed => break,
            JobStatus::Error => {
                let message = progress.error.unwrap_or_else(|| "unknown error".to_string());
                anyhow::bail!("Job {} failed: {}", job_id, message);
            }
        }
    }

    let results = client.result(&job_id).await?.results;
    println!();
    print_results(&TableView::default().apply(results));

    Ok(())
}
