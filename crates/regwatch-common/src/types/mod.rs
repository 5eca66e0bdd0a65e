//! Common types used across regwatch

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A record as returned by the upstream API.
///
/// No schema is assumed; field order is preserved from the response.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Paths of the artifacts written by a run.
///
/// Empty when the feed returned nothing and no files were produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xlsx: Option<PathBuf>,
}

impl ExportFiles {
    pub fn is_empty(&self) -> bool {
        self.json.is_none() && self.csv.is_none() && self.xlsx.is_none()
    }

    /// Written paths in attachment order (xlsx, csv, json).
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        [&self.xlsx, &self.csv, &self.json]
            .into_iter()
            .filter_map(|p| p.as_deref())
    }
}

/// Outcome of one daily run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of records inside the window
    pub count: usize,

    /// Window start (the checkpoint the run started from)
    pub from: NaiveDate,

    /// Window end (the run date)
    pub to: NaiveDate,

    pub files: ExportFiles,
}
