//! Regwatch Server Library
//!
//! HTTP trigger for the newly-registered-company poller.
//!
//! # Overview
//!
//! An external scheduler calls `/run/daily` with the cron secret; the server
//! runs the daily job from `regwatch-ingest` and reports the outcome. At most
//! one run is active at a time (see [`runner`]); concurrent triggers get
//! `409 Conflict`.
//!
//! # Example
//!
//! ```no_run
//! use regwatch_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod runner;

// Re-export commonly used types
pub use error::{AppError, AppResult};
