//! Error types for regwatch

use thiserror::Error;

/// Result type alias for regwatch operations
pub type Result<T> = std::result::Result<T, RegwatchError>;

/// Main error type for a job run
#[derive(Error, Debug)]
pub enum RegwatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing {0}")]
    MissingCredentials(String),

    #[error("Could not detect date field")]
    NoDateField,

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Giving up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<RegwatchError> },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Mail error: {0}")]
    Mail(String),
}

impl RegwatchError {
    /// Whether a failed upstream fetch is worth another attempt.
    ///
    /// Transport failures, 5xx and 429 are transient; any other status is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegwatchError::Network(_) => true,
            RegwatchError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
