//! Twitter/X API integration module.
//!
//! This module contains the [`ScrapeClient`] contract the harvester runs
//! against, and [`XApiClient`], its implementation over the X API v2
//! using an app-only bearer token.

mod api;
mod client;
mod follows;
mod parsing;
mod timeline;
mod types;
mod users;

// Re-export public API
pub use api::{PoolAccount, XApiClient};
pub use client::ScrapeClient;
pub use types::{EmbeddedPost, EngagementCounts, FetchedPost, PostReference, ReplyTarget, UserRef};
