//! The daily job: checkpoint → sniff → paginate → export → notify → checkpoint

use chrono::{Local, NaiveDate};
use regwatch_common::{ExportFiles, Record, Result, RunReport};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::checkpoint::CheckpointStore;
use crate::client::{DataApiClient, PageSource};
use crate::config::JobConfig;
use crate::export::write_exports;
use crate::notify::{Notifier, SmtpNotifier};
use crate::paginate::{order_records, scan, DateWindow, PageLimits};
use crate::schema::Schema;

/// One configured instance of the job
pub struct DailyJob {
    config: JobConfig,
    notifier: Option<Arc<dyn Notifier>>,
}

impl DailyJob {
    /// Build the job; mail delivery is wired up only if configured.
    pub fn new(config: JobConfig) -> Self {
        let notifier = config
            .mail
            .clone()
            .map(|mail| Arc::new(SmtpNotifier::new(mail)) as Arc<dyn Notifier>);
        Self { config, notifier }
    }

    /// Replace the notifier (or install one when mail is not configured)
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run for the local calendar day
    pub async fn run(&self) -> Result<RunReport> {
        self.run_for(Local::now().date_naive()).await
    }

    /// Run against the configured data API as if today were `today`.
    ///
    /// Credentials are checked before anything touches the network.
    pub async fn run_for(&self, today: NaiveDate) -> Result<RunReport> {
        let client = DataApiClient::new(&self.config, self.config.credentials()?)?;
        self.run_with(&client, today).await
    }

    /// Run against any page source.
    #[instrument(skip(self, source), fields(today = %today))]
    pub async fn run_with<S>(&self, source: &S, today: NaiveDate) -> Result<RunReport>
    where
        S: PageSource + ?Sized,
    {
        let store = CheckpointStore::new(&self.config.state_dir, self.config.lookback_days);
        let from = store.load(today).await;
        let window = DateWindow::new(from, today);
        info!(window = %window, "Starting daily run");

        let Some(schema) = self.sniff(source).await? else {
            info!("Feed returned no records; advancing checkpoint");
            store.save(today).await?;
            return Ok(RunReport {
                count: 0,
                from,
                to: today,
                files: ExportFiles::default(),
            });
        };

        let records = self.collect(source, &schema, window).await?;
        let files = write_exports(&records, &schema, &self.config.out_dir, today).await?;

        let report = RunReport {
            count: records.len(),
            from,
            to: today,
            files,
        };

        match &self.notifier {
            Some(notifier) => notifier.notify(&report).await?,
            None => debug!("Mail not configured; skipping notification"),
        }

        store.save(today).await?;
        info!(count = report.count, "Daily run complete");
        Ok(report)
    }

    /// Scan an arbitrary window without touching the checkpoint or mailing.
    pub async fn scan_window(&self, window: DateWindow) -> Result<Vec<Record>> {
        let client = DataApiClient::new(&self.config, self.config.credentials()?)?;
        self.scan_window_with(&client, window).await
    }

    #[instrument(skip(self, source), fields(window = %window))]
    pub async fn scan_window_with<S>(&self, source: &S, window: DateWindow) -> Result<Vec<Record>>
    where
        S: PageSource + ?Sized,
    {
        match self.sniff(source).await? {
            Some(schema) => self.collect(source, &schema, window).await,
            None => Ok(Vec::new()),
        }
    }

    /// Fetch the sample page and detect the schema; `None` for an empty feed.
    async fn sniff<S>(&self, source: &S) -> Result<Option<Schema>>
    where
        S: PageSource + ?Sized,
    {
        let sample = source.fetch_page(self.config.sample_size, 0, None).await?;
        let Some(first) = sample.first() else {
            return Ok(None);
        };
        Schema::sniff(first, self.config.date_field.as_deref()).map(Some)
    }

    async fn collect<S>(&self, source: &S, schema: &Schema, window: DateWindow) -> Result<Vec<Record>>
    where
        S: PageSource + ?Sized,
    {
        let limits = PageLimits {
            page_limit: self.config.page_limit,
            max_pages: self.config.max_pages,
        };
        let mut records = scan(source, schema, window, limits).await?.records;
        order_records(&mut records, schema);
        Ok(records)
    }
}
