//! End-to-end run: register accounts, harvest every target, emit rows.

use log::{debug, info};

use crate::classify::{emit_rows, BatchContext, Collection, FollowSets, PostIndex, TargetSet};
use crate::config::Credential;
use crate::dedup::DedupTracker;
use crate::error::ScrapeError;
use crate::harvest::harvest_user;
use crate::output::RowBuffer;
use crate::pacing::{random_pause, Pacer, PacingConfig};
use crate::pool::register_accounts;
use crate::twitter::ScrapeClient;

/// Position of the `index`-th target (1-based) out of `total`, as logged.
pub(crate) fn progress(index: usize, total: usize) -> String {
    let percent = if total == 0 {
        0.0
    } else {
        index as f64 / total as f64 * 100.0
    };
    format!("({}/{}, {:.2}% complete)", index, total, percent)
}

/// Runs a full scrape and returns the unsorted rows in emission order.
///
/// Targets are processed in list order, one at a time. Any fatal fetch
/// failure aborts the run and nothing is returned, so callers never write a
/// partial table.
pub async fn scrape_tweets(
    client: &mut dyn ScrapeClient,
    pacer: &dyn Pacer,
    credentials: &[Credential],
    targets: &[String],
    limit: usize,
    config: &PacingConfig,
) -> Result<RowBuffer, ScrapeError> {
    register_accounts(client, pacer, config, credentials).await?;

    let client: &dyn ScrapeClient = client;
    let target_set = TargetSet::new(targets);
    let mut dedup = DedupTracker::new();
    let mut rows = RowBuffer::new();
    let total_users = targets.len();

    for (position, handle) in targets.iter().enumerate() {
        let index = position + 1;
        info!(
            "Scraping tweets for user: {} {}",
            handle,
            progress(index, total_users)
        );

        let batch = match harvest_user(client, pacer, config, handle, limit).await? {
            Some(batch) => batch,
            None => continue,
        };

        let post_index = PostIndex::build(&[
            batch.posts.as_slice(),
            batch.posts_and_replies.as_slice(),
        ]);
        let follows = FollowSets::new(&batch.followers, &batch.following);
        debug!("Indexed {} posts for {}", post_index.len(), handle);
        let context = BatchContext {
            targets: &target_set,
            index: &post_index,
            follows: &follows,
        };

        let posts_stats = emit_rows(
            &batch.posts,
            Collection::Posts,
            &context,
            &mut dedup,
            &mut rows,
        );
        let replies_stats = emit_rows(
            &batch.posts_and_replies,
            Collection::PostsAndReplies,
            &context,
            &mut dedup,
            &mut rows,
        );
        info!(
            "Finished {}: {} rows from posts, {} from posts+replies \
             ({} duplicates, {} from other users)",
            handle,
            posts_stats.emitted,
            replies_stats.emitted,
            posts_stats.duplicates + replies_stats.duplicates,
            posts_stats.outside_targets + replies_stats.outside_targets
        );

        random_pause(pacer, config).await;
    }

    info!(
        "Scrape finished: {} rows from {} unique posts",
        rows.len(),
        dedup.count()
    );
    Ok(rows)
}
