//! Single-flight execution of the daily job
//!
//! At most one run is active per process. A trigger that arrives while a run
//! holds the gate is rejected with [`AppError::Busy`] rather than queued.

use regwatch_common::RunReport;
use regwatch_ingest::job::DailyJob;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::{AppError, AppResult};

/// Proof that the caller owns the run slot; releases it on drop.
#[derive(Debug)]
pub struct RunGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Shared handle to the job and its gate
#[derive(Clone)]
pub struct JobRunner {
    job: Arc<DailyJob>,
    gate: Arc<Mutex<()>>,
}

impl JobRunner {
    pub fn new(job: DailyJob) -> Self {
        Self {
            job: Arc::new(job),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Claim the run slot without waiting
    pub fn try_begin(&self) -> AppResult<RunGuard> {
        self.gate
            .clone()
            .try_lock_owned()
            .map(|guard| RunGuard { _guard: guard })
            .map_err(|_| AppError::Busy)
    }

    pub fn is_running(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Run and wait for the report.
    ///
    /// The run itself is spawned, so a caller that stops waiting (a dropped
    /// request) does not cancel it; the checkpoint is still saved.
    pub async fn run_now(&self) -> AppResult<RunReport> {
        let guard = self.try_begin()?;
        let report = self.spawn_run(guard).await.map_err(|e| {
            error!(error = %e, "Run task did not complete");
            AppError::Internal(format!("run task failed: {e}"))
        })??;
        Ok(report)
    }

    /// Claim the slot, then run on a spawned task.
    ///
    /// The slot is taken before returning so a second trigger right after
    /// this one is already rejected. The outcome is only logged.
    pub fn spawn_background(&self) -> AppResult<JoinHandle<()>> {
        let run = self.spawn_run(self.try_begin()?);

        Ok(tokio::spawn(async move {
            match run.await {
                Ok(Ok(report)) => info!(
                    count = report.count,
                    from = %report.from,
                    to = %report.to,
                    "Background run complete"
                ),
                Ok(Err(e)) => error!(error = %e, "Background run failed"),
                Err(e) => error!(error = %e, "Background run task did not complete"),
            }
        }))
    }

    /// Run the job on its own task; the slot is released when it finishes.
    fn spawn_run(&self, guard: RunGuard) -> JoinHandle<regwatch_common::Result<RunReport>> {
        let job = Arc::clone(&self.job);
        tokio::spawn(async move {
            let _guard = guard;
            job.run().await
        })
    }

    /// Wait up to `timeout` for an in-flight run to finish; `true` once idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.gate.lock()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regwatch_ingest::config::JobConfig;
    use tempfile::TempDir;

    fn runner(dir: &TempDir) -> JobRunner {
        JobRunner::new(DailyJob::new(JobConfig {
            state_dir: dir.path().join(".state"),
            out_dir: dir.path().join("out"),
            ..JobConfig::default()
        }))
    }

    #[tokio::test]
    async fn test_second_claim_is_rejected() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir);

        let guard = runner.try_begin().unwrap();
        assert!(runner.is_running());
        assert!(matches!(runner.try_begin(), Err(AppError::Busy)));
        assert!(matches!(runner.run_now().await, Err(AppError::Busy)));

        drop(guard);
        assert!(!runner.is_running());
        assert!(runner.try_begin().is_ok());
    }

    #[tokio::test]
    async fn test_failed_run_releases_the_slot() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir);

        let err = runner.run_now().await.unwrap_err();
        assert!(matches!(err, AppError::Job(_)));
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn test_background_run_holds_slot_until_done() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir);

        let handle = runner.spawn_background().unwrap();
        assert!(matches!(runner.spawn_background(), Err(AppError::Busy)));

        handle.await.unwrap();
        assert!(runner.wait_idle(Duration::from_secs(1)).await);
        assert!(!runner.is_running());
    }
}
