//! Open-data API client
//!
//! Resources answer `GET {base}/{resource}?api-key=&format=json&limit=&offset=`
//! with `{ "records": [ {...}, ... ] }`. The payload is untrusted: a missing
//! or non-array `records` is read as an empty page and non-object entries are
//! dropped.

use async_trait::async_trait;
use regwatch_common::{Record, RegwatchError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::{ApiCredentials, JobConfig};
use crate::retry::{retry_with_backoff, RetryPolicy};

/// A paged feed of records
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch up to `limit` records starting at `offset`, sorted newest-first on
    /// `sort_field` when one is given.
    async fn fetch_page(
        &self,
        limit: usize,
        offset: usize,
        sort_field: Option<&str>,
    ) -> Result<Vec<Record>>;
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    records: Value,
}

/// HTTP client for one data API resource
pub struct DataApiClient {
    client: Client,
    resource_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl DataApiClient {
    /// Create a client for the resource named in `credentials`
    pub fn new(config: &JobConfig, credentials: ApiCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(concat!("regwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegwatchError::Config(format!("Failed to build HTTP client: {e}")))?;

        let resource_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            credentials.resource_id
        );

        Ok(Self {
            client,
            resource_url,
            api_key: credentials.api_key,
            retry: RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
        })
    }

    /// One request, no retry
    async fn fetch_once(
        &self,
        limit: usize,
        offset: usize,
        sort_field: Option<&str>,
    ) -> Result<Vec<Record>> {
        let mut query = vec![
            ("api-key".to_string(), self.api_key.clone()),
            ("format".to_string(), "json".to_string()),
            ("limit".to_string(), limit.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        if let Some(field) = sort_field {
            query.push((format!("sort[{field}]"), "desc".to_string()));
        }

        let response = self
            .client
            .get(&self.resource_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| RegwatchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RegwatchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(RegwatchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let page: PageResponse = serde_json::from_str(&body)?;
        Ok(into_records(page.records))
    }
}

#[async_trait]
impl PageSource for DataApiClient {
    async fn fetch_page(
        &self,
        limit: usize,
        offset: usize,
        sort_field: Option<&str>,
    ) -> Result<Vec<Record>> {
        let label = format!("offset {offset}");
        let records = retry_with_backoff(&label, self.retry, move || {
            self.fetch_once(limit, offset, sort_field)
        })
        .await?;

        debug!(limit, offset, returned = records.len(), "Fetched page");
        Ok(records)
    }
}

fn into_records(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
