//! Regwatch Ingest - one-shot runs of the company registration poller

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use regwatch_common::logging::{init_logging, LogConfig, LogLevel};
use regwatch_ingest::{
    config::JobConfig, dates::month_start_back, export::to_json, job::DailyJob,
    paginate::DateWindow,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "regwatch-ingest")]
#[command(author, version, about = "Newly registered company poller")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the checkpointed daily job once
    Run,

    /// Scan an explicit window; the checkpoint is neither read nor written
    Window {
        /// Window start (YYYY-MM-DD)
        #[arg(long, conflicts_with = "months", required_unless_present = "months")]
        since: Option<NaiveDate>,

        /// Start on the first day of the month this many months back
        #[arg(long)]
        months: Option<u32>,

        /// Window end (YYYY-MM-DD), defaults to today
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Output file
        #[arg(short, long, default_value = "new_companies.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("regwatch-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let job = DailyJob::new(JobConfig::from_env()?);

    match cli.command {
        Command::Run => {
            let report = job.run().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        },
        Command::Window {
            since,
            months,
            until,
            output,
        } => {
            let today = Local::now().date_naive();
            let end = until.unwrap_or(today);
            let start = match (since, months) {
                (Some(since), _) => since,
                (None, Some(months)) => month_start_back(today, months)
                    .with_context(|| format!("{months} months back is out of range"))?,
                (None, None) => bail!("either --since or --months is required"),
            };
            if start > end {
                bail!("window start {start} is after its end {end}");
            }

            let records = job.scan_window(DateWindow::new(start, end)).await?;
            tokio::fs::write(&output, to_json(&records)?)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            info!(
                count = records.len(),
                output = %output.display(),
                "Window scan complete"
            );
        },
    }

    Ok(())
}
