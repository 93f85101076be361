//! Status command handler
//!
//! Prints the progress record of a job.

use anyhow::Result;
use colored::*;
use dealscope_core::domain::job::{JobProgress, JobStatus};

use crate::api::ApiClient;
use crate::config::Config;

/// Get and display the progress of a job
pub async fn handle_status_command(config: &Config, job_id: &str) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let progress = client.progress(job_id).await?;

    println!("{}", "Job Progress:".bold());
    println!("  ID:      {}", job_id.cyan());
    println!("  Status:  {}", colorize_status(progress.status));
    println!("  Step:    {}/{}", progress.current_step, progress.total_steps);
    println!("  Stage:   {}", progress.stage);

    if let Some(counts) = deal_counts(&progress) {
        println!("  Deals:   {}", counts);
    }

    if let Some(error) = &progress.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }

    Ok(())
}

/// One-line summary used while polling, e.g. `[2/3] Fetching custom field data (40/120 deals)`
pub fn progress_line(progress: &JobProgress) -> String {
    let mut line = format!(
        "[{}/{}] {}",
        progress.current_step, progress.total_steps, progress.stage
    );

    if let Some(counts) = deal_counts(progress) {
        line.push_str(&format!(" ({})", counts));
    }

    line
}

fn deal_counts(progress: &JobProgress) -> Option<String> {
    match (progress.deals_processed, progress.total_deals) {
        (Some(processed), Some(total)) => Some(format!("{}/{} deals", processed, total)),
        _ => None,
    }
}

/// Colorize job status for display
pub fn colorize_status(status: JobStatus) -> colored::ColoredString {
    match status {
        JobStatus::InProgress => "in progress".cyan(),
        JobStatus::Completed => "completed".green(),
        JobStatus::Error => "error".red(),
    }
}
