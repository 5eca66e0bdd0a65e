//! Checkpoint persistence
//!
//! The only durable state: the date the last successful run covered up to,
//! stored as `{"last_run_iso": "YYYY-MM-DD"}`.

use chrono::{Days, NaiveDate};
use regwatch_common::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::dates::parse_loose_str;

/// File name inside the state directory
pub const CHECKPOINT_FILE: &str = "last_run.json";

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    last_run_iso: String,
}

/// Reads and writes the checkpoint file
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    lookback_days: u32,
}

impl CheckpointStore {
    pub fn new(state_dir: impl AsRef<Path>, lookback_days: u32) -> Self {
        Self {
            path: state_dir.as_ref().join(CHECKPOINT_FILE),
            lookback_days,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored checkpoint, or `lookback_days` before `today` when the file
    /// is missing or unreadable.
    ///
    /// Full timestamps written by older deployments are accepted too.
    pub async fn load(&self, today: NaiveDate) -> NaiveDate {
        match self.read().await {
            Ok(Some(date)) => {
                debug!(checkpoint = %date, "Loaded checkpoint");
                date
            },
            Ok(None) => {
                let fallback = self.fallback(today);
                info!(checkpoint = %fallback, "No usable checkpoint; using default window");
                fallback
            },
            Err(e) => {
                let fallback = self.fallback(today);
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    checkpoint = %fallback,
                    "Failed to read checkpoint; using default window"
                );
                fallback
            },
        }
    }

    async fn read(&self) -> Result<Option<NaiveDate>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: CheckpointFile = serde_json::from_str(&raw)?;
        Ok(parse_loose_str(&file.last_run_iso))
    }

    fn fallback(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.lookback_days)))
            .unwrap_or(today)
    }

    /// Persist `date` as the new checkpoint.
    ///
    /// Written to a sibling temp file first and renamed into place, so a crash
    /// never leaves a half-written checkpoint behind.
    pub async fn save(&self, date: NaiveDate) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let body = serde_json::to_string_pretty(&CheckpointFile {
            last_run_iso: date.format("%Y-%m-%d").to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(checkpoint = %date, path = %self.path.display(), "Saved checkpoint");
        Ok(())
    }
}
