//! Result command handler
//!
//! Prints report rows as a table, with optional filtering and sorting.

use std::cmp::Ordering;

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::*;
use dealscope_core::domain::report::AggregatedResult;
use dealscope_core::dto::ResultResponse;

use crate::api::ApiClient;
use crate::config::Config;

/// Column the table is sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Highest count first
    #[default]
    Count,
    /// Country, alphabetically
    Country,
    /// Program, alphabetically
    Program,
}

/// Filter and ordering applied before printing
#[derive(Debug, Clone, Default)]
pub struct TableView {
    pub search: Option<String>,
    pub sort: SortKey,
    pub reverse: bool,
}

impl TableView {
    /// Filters and sorts `rows`
    ///
    /// The search is case-insensitive and matches country or program. The
    /// sort is stable, so rows with equal keys keep their server order.
    pub fn apply(&self, mut rows: Vec<AggregatedResult>) -> Vec<AggregatedResult> {
        if let Some(term) = self.search.as_deref().map(str::to_lowercase) {
            rows.retain(|row| {
                row.country.to_lowercase().contains(&term)
                    || row.program.to_lowercase().contains(&term)
            });
        }

        rows.sort_by(|a, b| {
            let ordering = self.compare(a, b);
            if self.reverse { ordering.reverse() } else { ordering }
        });

        rows
    }

    fn compare(&self, a: &AggregatedResult, b: &AggregatedResult) -> Ordering {
        match self.sort {
            SortKey::Count => b.count.cmp(&a.count),
            SortKey::Country => a.country.cmp(&b.country),
            SortKey::Program => a.program.cmp(&b.program),
        }
    }
}

/// Get and display the report rows of a job
pub async fn handle_result_command(
    config: &Config,
    job_id: &str,
    view: &TableView,
    json: bool,
) -> Result<()> {
    let client = ApiClient::new(&config.server_url);
    let results = view.apply(client.result(job_id).await?.results);

    if json {
        let body = serde_json::to_string_pretty(&ResultResponse { results })
            .context("Failed to serialize results")?;
        println!("{}", body);
        return Ok(());
    }

    print_results(&results);
    Ok(())
}

/// Print report rows as an aligned table with a total line
pub fn print_results(rows: &[AggregatedResult]) {
    if rows.is_empty() {
        println!("{}", "No lost deals matched.".yellow());
        return;
    }

    let country_width = column_width("Country", rows.iter().map(|r| r.country.as_str()));
    let program_width = column_width("Program", rows.iter().map(|r| r.program.as_str()));
    let total: usize = rows.iter().map(|r| r.count).sum();

    println!(
        "{}",
        format!(
            "{:<cw$}  {:<pw$}  {:>5}",
            "Country",
            "Program",
            "Count",
            cw = country_width,
            pw = program_width
        )
        .bold()
    );
    println!("{}", "─".repeat(country_width + program_width + 9).dimmed());

    for row in rows {
        println!(
            "{:<cw$}  {:<pw$}  {}",
            row.country,
            row.program,
            format!("{:>5}", row.count).cyan(),
            cw = country_width,
            pw = program_width
        );
    }

    println!("{}", "─".repeat(country_width + program_width + 9).dimmed());
    println!(
        "{} deal(s) across {} combination(s)",
        total.to_string().bold(),
        rows.len()
    );
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values
        .map(|v| v.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0)
}
