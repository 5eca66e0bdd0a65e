//! Regwatch Ingest Library
//!
//! Polls an open-data resource for newly registered companies and keeps the
//! records whose registration date falls inside a checkpointed window.
//!
//! # Pipeline
//!
//! 1. [`checkpoint`]: load the last run date (default: a week ago)
//! 2. [`schema`]: sniff the date and identity fields from a sample page
//! 3. [`paginate`]: walk pages sorted newest-first until the window is covered
//! 4. [`export`]: write JSON, CSV and XLSX artifacts
//! 5. [`notify`]: optionally mail the artifacts
//! 6. [`checkpoint`]: advance the checkpoint to today
//!
//! # Example
//!
//! ```no_run
//! use regwatch_ingest::{config::JobConfig, job::DailyJob};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let job = DailyJob::new(JobConfig::from_env()?);
//!     let report = job.run().await?;
//!     println!("{} new companies", report.count);
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod client;
pub mod config;
pub mod dates;
pub mod export;
pub mod job;
pub mod notify;
pub mod paginate;
pub mod retry;
pub mod schema;
