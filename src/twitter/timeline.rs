//! Paginated user timelines.

use log::{info, warn};

use super::api::XApiClient;
use super::parsing::parse_timeline_page;
use super::types::FetchedPost;
use crate::error::ScrapeError;

/// Page size bounds of the timeline endpoint.
const MIN_PAGE_SIZE: usize = 5;
const MAX_PAGE_SIZE: usize = 100;

const TWEET_FIELDS: &str =
    "id,text,created_at,lang,author_id,public_metrics,referenced_tweets,in_reply_to_user_id";
const EXPANSIONS: &str =
    "author_id,referenced_tweets.id,referenced_tweets.id.author_id,in_reply_to_user_id";

/// Which timeline to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimelineKind {
    /// Own posts, retweets and quotes; replies excluded
    Posts,
    /// Everything including replies
    PostsAndReplies,
}

impl TimelineKind {
    fn operation_name(self) -> &'static str {
        match self {
            TimelineKind::Posts => "user_tweets",
            TimelineKind::PostsAndReplies => "user_tweets_and_replies",
        }
    }
}

/// Fetches up to `limit` posts from a user's timeline, newest first.
///
/// # Returns
///
/// - `Ok(Vec<FetchedPost>)`: At most `limit` posts
/// - `Err(ScrapeError)`: If any page request fails
pub(crate) async fn fetch_user_timeline(
    client: &XApiClient,
    user_id: &str,
    limit: usize,
    kind: TimelineKind,
) -> Result<Vec<FetchedPost>, ScrapeError> {
    let operation_name = kind.operation_name();
    info!("Fetching {} for user {} (limit {})", operation_name, user_id, limit);

    let path = format!("/2/users/{}/tweets", user_id);
    let mut posts = Vec::new();
    let mut pagination_token: Option<String> = None;
    let mut page_count: u32 = 0;

    while posts.len() < limit {
        let page_size = (limit - posts.len()).clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
        let mut query = vec![
            ("max_results", page_size.to_string()),
            ("tweet.fields", TWEET_FIELDS.to_string()),
            ("expansions", EXPANSIONS.to_string()),
            ("user.fields", "id,username".to_string()),
        ];
        if kind == TimelineKind::Posts {
            query.push(("exclude", "replies".to_string()));
        }
        if let Some(token) = &pagination_token {
            query.push(("pagination_token", token.clone()));
        }

        let json_response = client.get_json(&path, &query, operation_name).await?;
        let page = parse_timeline_page(&json_response);
        page_count += 1;
        let page_len = page.items.len();
        posts.extend(page.items);

        pagination_token = page.next_token;
        if pagination_token.is_none() || page_len == 0 {
            break;
        }

        // Brief delay to respect rate limits
        tokio::time::sleep(client.page_delay).await;
    }

    if posts.len() > limit {
        posts.truncate(limit);
    }
    if posts.is_empty() {
        warn!("No posts returned by {} for user {}", operation_name, user_id);
    }

    info!(
        "Fetched {} posts via {} for user {} ({} pages)",
        posts.len(),
        operation_name,
        user_id,
        page_count
    );
    Ok(posts)
}
