//! Error types for the harvester.

use thiserror::Error;

/// Errors raised by the scrape client, the fetch wrappers and the writer.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the JSON we expected
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The platform throttled us
    #[error("Rate limited for operation '{operation}'{}", reset_hint(.reset_at))]
    RateLimited {
        operation: String,
        reset_at: Option<chrono::DateTime<chrono::Utc>>,
    },

    /// Access token rejected
    #[error("Unauthorized for operation '{0}'")]
    Unauthorized(String),

    /// Any other non-success status
    #[error("Twitter API error for operation '{operation}' ({status}): {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    /// Account with this login is already in the pool
    #[error("Account {0} already exists")]
    AccountExists(String),

    /// Account credential is unusable
    #[error("Invalid account {login}: {reason}")]
    InvalidAccount { login: String, reason: String },

    /// Login requested with an empty pool
    #[error("No accounts registered in the pool")]
    NoAccounts,

    /// Configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Whether this failure is the platform throttling us.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ScrapeError::RateLimited { .. })
    }
}

fn reset_hint(reset_at: &Option<chrono::DateTime<chrono::Utc>>) -> String {
    match reset_at {
        Some(at) => format!(", window resets at {}", at.to_rfc3339()),
        None => String::new(),
    }
}
