//! Twitter data types shared by the client and the row builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A platform account reference: numeric id plus handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Platform-assigned user ID.
    pub id: String,
    /// Handle (without @).
    pub username: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Engagement counters. Each one may be missing from the platform response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub view_count: Option<u64>,
    pub quote_count: Option<u64>,
    pub like_count: Option<u64>,
    pub reply_count: Option<u64>,
    pub retweet_count: Option<u64>,
    pub bookmark_count: Option<u64>,
}

/// A post embedded in another one (retweeted or quoted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedPost {
    pub id: String,
    pub username: String,
    pub raw_content: String,
}

/// The post a reply answers. Only the id is guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub tweet_id: String,
    pub username: Option<String>,
}

/// What a post points at. At most one kind per post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostReference {
    #[default]
    None,
    Retweet(EmbeddedPost),
    Quote(EmbeddedPost),
    Reply(ReplyTarget),
}

/// A post as returned by a timeline fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedPost {
    /// Unique post ID.
    pub id: String,
    /// Post author.
    pub author: UserRef,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// Raw post text.
    pub raw_content: String,
    /// Language code reported by the platform.
    pub lang: String,
    pub counts: EngagementCounts,
    pub reference: PostReference,
}
