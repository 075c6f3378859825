//! Duplicate detection for emitted posts.

use std::collections::HashSet;

/// Tracks post IDs already emitted during a run.
///
/// Scoped to the whole run, not to a single user: overlapping timelines from
/// different targets still produce one row per post.
#[derive(Debug, Clone, Default)]
pub struct DedupTracker {
    /// Set of emitted post IDs.
    processed_ids: HashSet<String>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `id` as emitted. Returns `false` if it already was.
    pub fn mark_processed(&mut self, id: &str) -> bool {
        self.processed_ids.insert(id.to_string())
    }

    /// Get the count of emitted IDs.
    pub fn count(&self) -> usize {
        self.processed_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_processed_reports_first_sighting_only() {
        let mut tracker = DedupTracker::new();
        assert_eq!(tracker.count(), 0);
        assert!(tracker.mark_processed("100"));
        assert!(!tracker.mark_processed("100"));
        assert!(tracker.mark_processed("101"));
        assert_eq!(tracker.count(), 2);
    }
}
