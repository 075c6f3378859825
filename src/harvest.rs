//! Per-user fetching: resolve a handle, then pull its timelines and follow graph.

use log::{info, warn};

use crate::error::ScrapeError;
use crate::pacing::{Pacer, PacingConfig};
use crate::retry::{retry_with_backoff, with_cooldown};
use crate::twitter::{FetchedPost, ScrapeClient, UserRef};

/// Everything fetched for one target user.
#[derive(Debug, Clone)]
pub struct UserBatch {
    pub user: UserRef,
    pub posts: Vec<FetchedPost>,
    pub posts_and_replies: Vec<FetchedPost>,
    pub followers: Vec<UserRef>,
    pub following: Vec<UserRef>,
}

/// Fetches the batch for `handle`.
///
/// Returns `Ok(None)` when the handle does not resolve. The two timelines are
/// fetched together under the rate-limit cooldown; user resolution and the
/// follow lists only get the backoff wrapper.
pub async fn harvest_user(
    client: &dyn ScrapeClient,
    pacer: &dyn Pacer,
    config: &PacingConfig,
    handle: &str,
    limit: usize,
) -> Result<Option<UserBatch>, ScrapeError> {
    let resolved = retry_with_backoff(pacer, config, "user_by_login", || {
        client.user_by_login(handle)
    })
    .await?;

    let user = match resolved {
        Some(user) => user,
        None => {
            warn!("User {} not found.", handle);
            return Ok(None);
        }
    };
    let user_id = user.id.as_str();

    let (posts, posts_and_replies) = with_cooldown(pacer, config, "user_tweets", || async move {
        let posts = client.user_tweets(user_id, limit).await?;
        let posts_and_replies = client.user_tweets_and_replies(user_id, limit).await?;
        Ok::<_, ScrapeError>((posts, posts_and_replies))
    })
    .await?;

    let followers = retry_with_backoff(pacer, config, "followers", || {
        client.followers(user_id, limit)
    })
    .await?;
    let following = retry_with_backoff(pacer, config, "following", || {
        client.following(user_id, limit)
    })
    .await?;

    info!(
        "Fetched for {}: {} posts, {} posts+replies, {} followers, {} following",
        user.username,
        posts.len(),
        posts_and_replies.len(),
        followers.len(),
        following.len()
    );

    Ok(Some(UserBatch {
        user,
        posts,
        posts_and_replies,
        followers,
        following,
    }))
}
