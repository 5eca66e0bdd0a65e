//! Regwatch Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the regwatch workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`RegwatchError`] and the [`Result`] alias used by the job
//! - **Logging**: `tracing` subscriber setup shared by the CLI and the server
//! - **Types**: run reports and export file sets returned by a job run
//!
//! # Example
//!
//! ```no_run
//! use regwatch_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{RegwatchError, Result};
pub use types::{ExportFiles, Record, RunReport};
