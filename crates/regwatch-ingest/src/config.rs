//! Job configuration
//!
//! Everything the daily job needs is gathered into [`JobConfig`] once and
//! passed in at construction; nothing below reads the environment.

use regwatch_common::{RegwatchError, Result};
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Data API Constants
// ============================================================================

/// Base URL of the open-data resource API; the resource id is appended.
pub const DEFAULT_BASE_URL: &str = "https://api.data.gov.in/resource";

/// Records requested per page while paginating.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Upper bound on pages fetched in one run.
pub const DEFAULT_MAX_PAGES: usize = 200;

/// Records requested for schema sniffing.
pub const DEFAULT_SAMPLE_SIZE: usize = 50;

/// Per-request timeout for data API calls in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Extra attempts after a transient fetch failure.
pub const DEFAULT_FETCH_MAX_RETRIES: u32 = 3;

/// First backoff delay in milliseconds; doubles per attempt.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1000;

/// Window length used when no checkpoint can be read.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

pub const DEFAULT_STATE_DIR: &str = ".state";
pub const DEFAULT_OUT_DIR: &str = "out";

// ============================================================================
// Mail Constants
// ============================================================================

pub const DEFAULT_SMTP_HOST: &str = "smtp-relay.brevo.com";
pub const DEFAULT_SMTP_PORT: u16 = 2525;
pub const DEFAULT_MAIL_SUBJECT: &str = "Newly Registered Companies";

/// Configuration for one daily job
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// `DGI_API_KEY`; checked when a run starts, not at load time
    pub api_key: Option<String>,

    /// `DGI_RESOURCE_ID`; checked when a run starts, not at load time
    pub resource_id: Option<String>,

    pub base_url: String,
    pub page_limit: usize,
    pub max_pages: usize,
    pub sample_size: usize,

    /// Skip detection and use this field as the registration date
    pub date_field: Option<String>,

    pub fetch_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,

    /// Holds the checkpoint file
    pub state_dir: PathBuf,

    /// Receives the exported artifacts
    pub out_dir: PathBuf,

    pub lookback_days: u32,

    /// Present only when SMTP credentials and recipients are all set
    pub mail: Option<MailConfig>,
}

/// SMTP delivery settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub recipients: Vec<String>,
    pub subject: String,
}

/// Validated data API credentials
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub resource_id: String,
}

impl JobConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = JobConfig {
            api_key: env_opt("DGI_API_KEY"),
            resource_id: env_opt("DGI_RESOURCE_ID"),
            base_url: env_opt("DGI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            page_limit: env_or("PAGE_LIMIT", DEFAULT_PAGE_LIMIT),
            max_pages: env_or("MAX_PAGES", DEFAULT_MAX_PAGES),
            sample_size: env_or("SAMPLE_SIZE", DEFAULT_SAMPLE_SIZE),
            date_field: env_opt("DATE_FIELD"),
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS),
            max_retries: env_or("FETCH_MAX_RETRIES", DEFAULT_FETCH_MAX_RETRIES),
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", DEFAULT_RETRY_BASE_DELAY_MS),
            state_dir: env_opt("STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
            out_dir: env_opt("OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            lookback_days: env_or("LOOKBACK_DAYS", DEFAULT_LOOKBACK_DAYS),
            mail: MailConfig::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.page_limit == 0 {
            return Err(RegwatchError::Config("PAGE_LIMIT must be greater than 0".into()));
        }
        if self.max_pages == 0 {
            return Err(RegwatchError::Config("MAX_PAGES must be greater than 0".into()));
        }
        if self.sample_size == 0 {
            return Err(RegwatchError::Config("SAMPLE_SIZE must be greater than 0".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(RegwatchError::Config("DGI_BASE_URL cannot be empty".into()));
        }

        if self.mail.is_none() {
            tracing::debug!("Mail delivery not configured; runs will skip notification");
        }

        Ok(())
    }

    /// The API key and resource id, or the error that aborts the run
    pub fn credentials(&self) -> Result<ApiCredentials> {
        match (&self.api_key, &self.resource_id) {
            (Some(api_key), Some(resource_id)) => Ok(ApiCredentials {
                api_key: api_key.clone(),
                resource_id: resource_id.clone(),
            }),
            _ => Err(RegwatchError::MissingCredentials(
                "DGI_API_KEY/DGI_RESOURCE_ID".to_string(),
            )),
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            resource_id: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
            sample_size: DEFAULT_SAMPLE_SIZE,
            date_field: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_retries: DEFAULT_FETCH_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            mail: None,
        }
    }
}

impl MailConfig {
    /// `None` unless `BREVO_USER`, `BREVO_PASS` and `MAIL_TO` are all set
    pub fn from_env() -> Option<Self> {
        let username = env_opt("BREVO_USER")?;
        let password = env_opt("BREVO_PASS")?;
        let recipients = parse_recipients(&env_opt("MAIL_TO")?);
        if recipients.is_empty() {
            return None;
        }

        Some(MailConfig {
            host: env_opt("BREVO_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port: env_or("BREVO_PORT", DEFAULT_SMTP_PORT),
            from: env_opt("MAIL_FROM").unwrap_or_else(|| username.clone()),
            subject: env_opt("MAIL_SUBJECT").unwrap_or_else(|| DEFAULT_MAIL_SUBJECT.to_string()),
            username,
            password,
            recipients,
        })
    }
}

/// Split a comma-separated recipient list, dropping blanks
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = JobConfig::default();
        assert_eq!(config.page_limit, 1000);
        assert_eq!(config.max_pages, 200);
        assert_eq!(config.sample_size, 50);
        assert_eq!(config.lookback_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_page_limit_is_rejected() {
        let config = JobConfig {
            page_limit: 0,
            ..JobConfig::default()
        };
        assert!(matches!(config.validate(), Err(RegwatchError::Config(_))));
    }

    #[test]
    fn test_missing_credentials() {
        let config = JobConfig {
            api_key: Some("key".into()),
            ..JobConfig::default()
        };
        let err = config.credentials().unwrap_err();
        assert_eq!(err.to_string(), "Missing DGI_API_KEY/DGI_RESOURCE_ID");

        let config = JobConfig {
            api_key: Some("key".into()),
            resource_id: Some("res".into()),
            ..JobConfig::default()
        };
        let creds = config.credentials().unwrap();
        assert_eq!(creds.resource_id, "res");
    }

    #[test]
    fn test_parse_recipients_trims_and_drops_blanks() {
        assert_eq!(
            parse_recipients(" a@example.com, ,b@example.com,"),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert!(parse_recipients(" , ").is_empty());
    }
}
