//! Post classification and row building.
//!
//! Turns the posts fetched for one target into [`OutputRow`]s: filters out
//! authors outside the target list, drops posts already emitted this run,
//! classifies each post, resolves what it points at, and tags mutuality.

use log::{debug, info};
use std::collections::{HashMap, HashSet};

use crate::dedup::DedupTracker;
use crate::output::{Mutuality, OutputRow, RowBuffer};
use crate::twitter::{EmbeddedPost, FetchedPost, PostReference, ReplyTarget, UserRef};

/// Picks the single reference kind of a post.
///
/// Precedence is retweet, then quote, then reply: a quote is only considered
/// when there is no retweet, and a reply only when there is neither.
pub fn classify_reference(
    retweeted: Option<EmbeddedPost>,
    quoted: Option<EmbeddedPost>,
    replied_to: Option<ReplyTarget>,
) -> PostReference {
    match (retweeted, quoted, replied_to) {
        (Some(post), _, _) => PostReference::Retweet(post),
        (None, Some(post), _) => PostReference::Quote(post),
        (None, None, Some(target)) => PostReference::Reply(target),
        (None, None, None) => PostReference::None,
    }
}

/// Which fetch a post came from. Mutuality is computed differently for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// The user's own posts
    Posts,
    /// The user's posts and replies
    PostsAndReplies,
}

/// Handles the run is restricted to. Matching ignores ASCII case.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    handles: HashSet<String>,
}

impl TargetSet {
    pub fn new<S: AsRef<str>>(handles: &[S]) -> Self {
        Self {
            handles: handles
                .iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.handles.contains(&handle.to_ascii_lowercase())
    }
}

/// Follower and following sets of one target, by id and by handle.
#[derive(Debug, Clone, Default)]
pub struct FollowSets {
    follower_ids: HashSet<String>,
    following_ids: HashSet<String>,
    follower_handles: HashSet<String>,
    following_handles: HashSet<String>,
}

impl FollowSets {
    pub fn new(followers: &[UserRef], following: &[UserRef]) -> Self {
        Self {
            follower_ids: followers.iter().map(|u| u.id.clone()).collect(),
            following_ids: following.iter().map(|u| u.id.clone()).collect(),
            follower_handles: followers
                .iter()
                .map(|u| u.username.to_ascii_lowercase())
                .collect(),
            following_handles: following
                .iter()
                .map(|u| u.username.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Mutuality used for rows from the posts fetch: the author's id must be
    /// in both the follower and the following id sets.
    pub fn mutuality_by_id(&self, user_id: &str) -> Mutuality {
        Mutuality::from_bool(
            self.follower_ids.contains(user_id) && self.following_ids.contains(user_id),
        )
    }

    /// Mutuality used for rows from the posts+replies fetch: the reply
    /// target's handle must be in both handle sets, ignoring ASCII case like
    /// [`TargetSet`]. No target means not mutual.
    //
    // NOTE: not the same relationship as `mutuality_by_id`.
    pub fn mutuality_by_handle(&self, handle: Option<&str>) -> Mutuality {
        Mutuality::from_bool(handle.is_some_and(|h| {
            let h = h.to_ascii_lowercase();
            self.follower_handles.contains(&h) && self.following_handles.contains(&h)
        }))
    }
}

/// Lookup of every post fetched for one target, by id.
///
/// Only used to find the text of a reply target fetched in the same batch.
#[derive(Debug, Default)]
pub struct PostIndex<'a> {
    posts: HashMap<&'a str, &'a FetchedPost>,
}

impl<'a> PostIndex<'a> {
    pub fn build(collections: &[&'a [FetchedPost]]) -> Self {
        let mut posts = HashMap::new();
        for collection in collections {
            for post in collection.iter() {
                posts.insert(post.id.as_str(), post);
            }
        }
        Self { posts }
    }

    pub fn text_of(&self, id: &str) -> Option<&'a str> {
        self.posts.get(id).map(|post| post.raw_content.as_str())
    }

    pub(crate) fn len(&self) -> usize {
        self.posts.len()
    }
}

/// Builds the row for one post.
pub fn build_row(
    post: &FetchedPost,
    collection: Collection,
    index: &PostIndex<'_>,
    follows: &FollowSets,
) -> OutputRow {
    let mut reply_to_id = None;
    let mut reply_to_user = None;
    let mut reply_to_text = None;
    let mut original_tweet_id = None;
    let mut original_tweet_user = None;
    let mut original_tweet_text = None;

    match &post.reference {
        PostReference::Retweet(original) | PostReference::Quote(original) => {
            original_tweet_id = Some(original.id.clone());
            original_tweet_user = Some(original.username.clone());
            original_tweet_text = Some(original.raw_content.clone());
        }
        PostReference::Reply(target) => {
            let text = index.text_of(&target.tweet_id).map(String::from);
            reply_to_id = Some(target.tweet_id.clone());
            reply_to_user = target.username.clone();
            reply_to_text = text.clone();
            original_tweet_id = reply_to_id.clone();
            original_tweet_user = reply_to_user.clone();
            original_tweet_text = text;
        }
        PostReference::None => {}
    }

    let is_mutual_followership = match collection {
        Collection::Posts => follows.mutuality_by_id(&post.author.id),
        Collection::PostsAndReplies => follows.mutuality_by_handle(reply_to_user.as_deref()),
    };

    OutputRow {
        tweet_id: post.id.clone(),
        user: post.author.username.clone(),
        created_at: post.created_at,
        post_text: post.raw_content.clone(),
        lang: post.lang.clone(),
        view_count: post.counts.view_count,
        quote_count: post.counts.quote_count,
        like_count: post.counts.like_count,
        reply_count: post.counts.reply_count,
        retweet_count: post.counts.retweet_count,
        bookmark_count: post.counts.bookmark_count,
        is_retweet: matches!(post.reference, PostReference::Retweet(_)),
        is_quote: matches!(post.reference, PostReference::Quote(_)),
        is_reply: matches!(post.reference, PostReference::Reply(_)),
        reply_to_id,
        reply_to_user,
        reply_to_text,
        original_tweet_id,
        original_tweet_user,
        original_tweet_text,
        is_mutual_followership,
    }
}

/// Counters for one pass over a collection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmitStats {
    pub emitted: usize,
    pub outside_targets: usize,
    pub duplicates: usize,
}

/// Everything the row builder needs about the current target.
pub struct BatchContext<'a, 'b> {
    pub targets: &'b TargetSet,
    pub index: &'b PostIndex<'a>,
    pub follows: &'b FollowSets,
}

/// Filters, deduplicates and converts `posts` into rows appended to `rows`.
pub fn emit_rows(
    posts: &[FetchedPost],
    collection: Collection,
    context: &BatchContext<'_, '_>,
    dedup: &mut DedupTracker,
    rows: &mut RowBuffer,
) -> EmitStats {
    let mut stats = EmitStats::default();

    for post in posts {
        debug!("{:?} data: {:?}", collection, post);

        if !context.targets.contains(&post.author.username) {
            info!("Skipping tweet from user: {}", post.author.username);
            stats.outside_targets += 1;
            continue;
        }

        if !dedup.mark_processed(&post.id) {
            info!("Duplicate tweet ID: {}, skipping.", post.id);
            stats.duplicates += 1;
            continue;
        }

        let row = build_row(post, collection, context.index, context.follows);
        info!(
            "Tweet ID: {} - is_retweet: {}, is_quote: {}, is_reply: {}, mutuality: {:?}",
            row.tweet_id, row.is_retweet, row.is_quote, row.is_reply, row.is_mutual_followership
        );
        rows.push(row);
        stats.emitted += 1;
        info!("Processed tweet ID: {} for user: {}", post.id, post.author.username);
    }

    stats
}
