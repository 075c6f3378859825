//! Core X API utilities.
//!
//! This module contains the HTTP client handle and the low-level helper that
//! makes authenticated requests and maps response statuses onto [`ScrapeError`].

use log::{debug, error, info, warn};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

use crate::config::{Credential, XApiConfig};
use crate::error::ScrapeError;

/// Delay between consecutive page requests of one paginated fetch.
const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// This function:
/// - Truncates long text to prevent log flooding
/// - Replaces control characters that could manipulate log output
/// - Escapes newlines to prevent log injection
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    // Replace control characters and newlines to prevent log injection
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// Builds the Authorization header for OAuth 2.0 User Context authentication.
pub(crate) fn build_bearer_header(access_token: &str) -> String {
    format!("Bearer {}", access_token)
}

/// An account registered in the client's pool.
#[derive(Debug, Clone)]
pub struct PoolAccount {
    pub credential: Credential,
    /// Set once `login_all` has verified the session
    pub active: bool,
}

/// X API v2 client implementing the scrape contract.
#[derive(Debug)]
pub struct XApiClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) access_token: String,
    pub(crate) accounts: Vec<PoolAccount>,
    pub(crate) page_delay: Duration,
}

impl XApiClient {
    /// Creates a client from the loaded API settings.
    ///
    /// # Returns
    ///
    /// - `Ok(XApiClient)`: A client with an empty account pool
    /// - `Err(ScrapeError::Config)`: If the base URL is not a valid absolute URL
    pub fn new(config: &XApiConfig) -> Result<Self, ScrapeError> {
        let parsed = Url::parse(&config.base_url).map_err(|e| {
            ScrapeError::Config(format!("invalid API base URL '{}': {}", config.base_url, e))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ScrapeError::Config(format!(
                "API base URL '{}' cannot be used as a base",
                config.base_url
            )));
        }

        Ok(XApiClient {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            accounts: Vec::new(),
            page_delay: DEFAULT_PAGE_DELAY,
        })
    }

    /// Overrides the delay between page requests.
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Accounts registered so far.
    pub fn accounts(&self) -> &[PoolAccount] {
        &self.accounts
    }

    /// Number of accounts with a verified session.
    pub fn active_accounts(&self) -> usize {
        self.accounts.iter().filter(|a| a.active).count()
    }

    /// Makes an authenticated GET request and parses the JSON body.
    ///
    /// # Parameters
    ///
    /// - `path`: API path starting with `/2/`
    /// - `query`: Query string pairs
    /// - `operation_name`: Human-readable name for the operation (for logging and errors)
    ///
    /// # Returns
    ///
    /// - `Ok(serde_json::Value)`: The parsed response body on success
    /// - `Err(ScrapeError::RateLimited)`: On HTTP 429
    /// - `Err(ScrapeError::Unauthorized)`: On HTTP 401
    /// - `Err(ScrapeError::Api)`: On any other non-success status
    pub(crate) async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
        operation_name: &str,
    ) -> Result<serde_json::Value, ScrapeError> {
        let url = format!("{}{}", self.base_url, path);
        info!(
            "Making authenticated request for operation: {}",
            operation_name
        );
        debug!("Request URL: {} query: {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .header("Authorization", build_bearer_header(&self.access_token))
            .query(query)
            .send()
            .await?;

        let status = response.status();
        debug!(
            "Received response with status: {} for operation: {}",
            status, operation_name
        );

        if status.is_success() {
            let response_text = response.text().await?;
            debug!(
                "Response summary for '{}': {} bytes received",
                operation_name,
                response_text.len()
            );
            return Ok(serde_json::from_str(&response_text)?);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
                .and_then(|secs| chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0));
            warn!(
                "Rate limited for operation '{}' (reset at {:?})",
                operation_name, reset_at
            );
            return Err(ScrapeError::RateLimited {
                operation: operation_name.to_string(),
                reset_at,
            });
        }

        let error_text = response.text().await.unwrap_or_default();

        if status == StatusCode::UNAUTHORIZED {
            error!(
                "Received 401 Unauthorized for operation '{}' - access token may be expired",
                operation_name
            );
            return Err(ScrapeError::Unauthorized(operation_name.to_string()));
        }

        error!("Operation '{}' failed - Status: {}", operation_name, status);
        debug!(
            "Error response for '{}': {}",
            operation_name,
            sanitize_for_logging(&error_text, 200)
        );
        Err(ScrapeError::Api {
            operation: operation_name.to_string(),
            status: status.as_u16(),
            message: sanitize_for_logging(&error_text, 200),
        })
    }
}
