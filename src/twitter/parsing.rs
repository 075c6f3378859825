//! JSON response parsing for X API v2 pages.
//!
//! Timeline pages carry the posts in `data` and the objects they point at
//! (authors, referenced posts, reply targets' authors) in `includes`.

use log::{debug, error, warn};
use serde_json::Value;
use std::collections::HashMap;

use super::types::{EmbeddedPost, EngagementCounts, FetchedPost, ReplyTarget, UserRef};
use crate::classify::classify_reference;

/// One parsed page of a paginated endpoint.
#[derive(Debug, Default)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

fn next_token(json_response: &Value) -> Option<String> {
    json_response
        .get("meta")
        .and_then(|m| m.get("next_token"))
        .and_then(|t| t.as_str())
        .map(String::from)
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

/// Parses a `data` user object into a [`UserRef`].
pub(crate) fn parse_user(user: &Value) -> Option<UserRef> {
    match (str_field(user, "id"), str_field(user, "username")) {
        (Some(id), Some(username)) => Some(UserRef::new(id, username)),
        _ => None,
    }
}

/// Parses one page of a followers/following response.
pub(crate) fn parse_user_page(json_response: &Value) -> Page<UserRef> {
    let items = json_response
        .get("data")
        .and_then(|d| d.as_array())
        .map(|users| users.iter().filter_map(parse_user).collect())
        .unwrap_or_default();

    Page {
        items,
        next_token: next_token(json_response),
    }
}

fn parse_counts(tweet: &Value) -> EngagementCounts {
    let metrics = tweet.get("public_metrics");
    let count = |key: &str| metrics.and_then(|m| m.get(key)).and_then(|v| v.as_u64());

    EngagementCounts {
        view_count: count("impression_count"),
        quote_count: count("quote_count"),
        like_count: count("like_count"),
        reply_count: count("reply_count"),
        retweet_count: count("retweet_count"),
        bookmark_count: count("bookmark_count"),
    }
}

/// Parses one page of a user timeline response.
///
/// Posts whose author or creation time cannot be read are logged and skipped.
/// Retweet and quote references whose target is missing from `includes`
/// (deleted or protected posts) are treated as absent.
pub(crate) fn parse_timeline_page(json_response: &Value) -> Page<FetchedPost> {
    // Create maps of user ID to username and post ID to post for quick lookup
    let mut users_username_map: HashMap<&str, &str> = HashMap::new();
    let mut included_tweets: HashMap<&str, &Value> = HashMap::new();

    if let Some(includes) = json_response.get("includes") {
        if let Some(users) = includes.get("users").and_then(|u| u.as_array()) {
            for user in users {
                if let (Some(id), Some(username)) =
                    (str_field(user, "id"), str_field(user, "username"))
                {
                    users_username_map.insert(id, username);
                }
            }
        }
        if let Some(tweets) = includes.get("tweets").and_then(|t| t.as_array()) {
            for tweet in tweets {
                if let Some(id) = str_field(tweet, "id") {
                    included_tweets.insert(id, tweet);
                }
            }
        }
    }

    let embedded = |id: &str| -> Option<EmbeddedPost> {
        let tweet = included_tweets.get(id)?;
        let username = str_field(tweet, "author_id")
            .and_then(|author_id| users_username_map.get(author_id))
            .copied()
            .unwrap_or_default();
        Some(EmbeddedPost {
            id: id.to_string(),
            username: username.to_string(),
            raw_content: str_field(tweet, "text").unwrap_or_default().to_string(),
        })
    };

    let mut items = Vec::new();
    let tweets = json_response
        .get("data")
        .and_then(|d| d.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    for tweet in tweets {
        let id = match str_field(tweet, "id") {
            Some(id) => id,
            None => {
                warn!("Skipping timeline entry without an id");
                continue;
            }
        };

        let author = match str_field(tweet, "author_id")
            .and_then(|author_id| users_username_map.get(author_id).map(|name| (author_id, *name)))
        {
            Some((author_id, username)) => UserRef::new(author_id, username),
            None => {
                warn!("Tweet {} has no resolvable author, skipping", id);
                continue;
            }
        };

        let created_at = match str_field(tweet, "created_at") {
            Some(created_at_str) => match chrono::DateTime::parse_from_rfc3339(created_at_str) {
                Ok(dt) => dt.with_timezone(&chrono::Utc),
                Err(e) => {
                    error!("Failed to parse created_at '{}': {}", created_at_str, e);
                    continue;
                }
            },
            None => {
                error!("Tweet {} missing created_at field", id);
                continue;
            }
        };

        let mut retweeted = None;
        let mut quoted = None;
        let mut replied_to = None;
        if let Some(references) = tweet.get("referenced_tweets").and_then(|r| r.as_array()) {
            for reference in references {
                let (Some(kind), Some(ref_id)) =
                    (str_field(reference, "type"), str_field(reference, "id"))
                else {
                    continue;
                };
                match kind {
                    "retweeted" => retweeted = embedded(ref_id),
                    "quoted" => quoted = embedded(ref_id),
                    "replied_to" => {
                        replied_to = Some(ReplyTarget {
                            tweet_id: ref_id.to_string(),
                            username: str_field(tweet, "in_reply_to_user_id")
                                .and_then(|user_id| users_username_map.get(user_id))
                                .map(|name| name.to_string()),
                        })
                    }
                    other => debug!("Ignoring reference type '{}' on tweet {}", other, id),
                }
            }
        }

        items.push(FetchedPost {
            id: id.to_string(),
            author,
            created_at,
            raw_content: str_field(tweet, "text").unwrap_or_default().to_string(),
            lang: str_field(tweet, "lang").unwrap_or_default().to_string(),
            counts: parse_counts(tweet),
            reference: classify_reference(retweeted, quoted, replied_to),
        });
    }

    Page {
        items,
        next_token: next_token(json_response),
    }
}
