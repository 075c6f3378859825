//! # xharvest Library
//!
//! Scrapes the posts of a list of target users from X (Twitter), joins them
//! with each user's follower and following lists, and flattens everything
//! into a single CSV table.
//!
//! ## Pipeline
//!
//! - Register a pool of accounts and log them in (`pool`)
//! - For each target handle, fetch posts, posts with replies, followers and
//!   following (`harvest`), under backoff and a rate-limit cooldown (`retry`)
//! - Classify each post as original, retweet, quote or reply, resolve what it
//!   points at and tag follow mutuality (`classify`)
//! - Emit each post identifier once per run (`dedup`)
//! - Sort by user and timestamp and write the table (`output`)
//!
//! ## Configuration
//!
//! The following environment variables are read by [`config::XApiConfig`]:
//! - `xapi_access_token`: X API v2 bearer token (required)
//! - `XAPI_BASE_URL`: API base URL (defaults to `https://api.x.com`)
//!
//! Run parameters come from the command line, see the `xharvest` binary.

pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod harvest;
pub mod output;
pub mod pacing;
pub mod pool;
pub mod retry;
pub mod scrape;
pub mod twitter;

// Re-export commonly used types and functions
pub use config::{load_credentials, load_target_users, Credential, XApiConfig};
pub use error::ScrapeError;
pub use output::{save_csv, OutputRow, RowBuffer};
pub use pacing::{Pacer, PacingConfig, TokioPacer};
pub use scrape::scrape_tweets;
pub use twitter::{ScrapeClient, XApiClient};

#[cfg(test)]
mod tests;
