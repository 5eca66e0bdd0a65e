//! API response types

use regwatch_common::RunReport;
use serde::Serialize;

/// Message returned by the background trigger
pub const STARTED_MESSAGE: &str = "Job started in background";

/// `GET /healthz`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

/// Synchronous run outcome: `{ok, count, from, to, files}`
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub ok: bool,
    #[serde(flatten)]
    pub report: RunReport,
}

impl From<RunReport> for RunResponse {
    fn from(report: RunReport) -> Self {
        Self { ok: true, report }
    }
}

/// Acknowledgement of a background run
#[derive(Debug, Serialize)]
pub struct StartedResponse {
    pub ok: bool,
    pub message: &'static str,
}

impl StartedResponse {
    pub fn new() -> Self {
        Self {
            ok: true,
            message: STARTED_MESSAGE,
        }
    }
}

impl Default for StartedResponse {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use regwatch_common::ExportFiles;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_run_response_is_flat() {
        let response = RunResponse::from(RunReport {
            count: 2,
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            files: ExportFiles {
                csv: Some(PathBuf::from("out/new_companies_2024-01-10.csv")),
                ..ExportFiles::default()
            },
        });

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "ok": true,
                "count": 2,
                "from": "2024-01-01",
                "to": "2024-01-10",
                "files": { "csv": "out/new_companies_2024-01-10.csv" },
            })
        );
    }

    #[test]
    fn test_started_response() {
        assert_eq!(
            serde_json::to_value(StartedResponse::new()).unwrap(),
            json!({ "ok": true, "message": "Job started in background" })
        );
    }
}
