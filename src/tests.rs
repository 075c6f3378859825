//! # Tests Module
//!
//! End-to-end tests of a scrape run against an in-memory client.
//!
//! ## Test Categories
//!
//! - Account pool registration and login
//! - Target ordering, skipping and outsider filtering
//! - Deduplication across the two timeline fetches
//! - Backoff and the rate-limit cooldown
//! - Row invariants and the written CSV
//!
//! ## Test Environment
//!
//! Sleeps go through a recording pacer, so no test waits on a real timer.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use crate::config::Credential;
use crate::error::ScrapeError;
use crate::output::{save_csv, Mutuality};
use crate::pacing::testing::RecordingPacer;
use crate::pacing::PacingConfig;
use crate::scrape::scrape_tweets;
use crate::twitter::{
    EmbeddedPost, EngagementCounts, FetchedPost, PostReference, ReplyTarget, ScrapeClient, UserRef,
};

/// In-memory client keyed by handle (lookups) and user id (fetches).
#[derive(Default)]
struct MockClient {
    users: HashMap<String, UserRef>,
    posts: HashMap<String, Vec<FetchedPost>>,
    posts_and_replies: HashMap<String, Vec<FetchedPost>>,
    followers: HashMap<String, Vec<UserRef>>,
    following: HashMap<String, Vec<UserRef>>,
    rejected_logins: HashSet<String>,
    fail_login: bool,
    rate_limits_left: Mutex<u32>,
    follower_failures_left: Mutex<u32>,
    follower_rate_limits_left: Mutex<u32>,
    calls: Mutex<Vec<String>>,
}

impl MockClient {
    fn with_user(
        mut self,
        user: &UserRef,
        posts: Vec<FetchedPost>,
        posts_and_replies: Vec<FetchedPost>,
    ) -> Self {
        self.users.insert(user.username.clone(), user.clone());
        self.posts.insert(user.id.clone(), posts);
        self.posts_and_replies.insert(user.id.clone(), posts_and_replies);
        self
    }

    fn with_follows(
        mut self,
        user: &UserRef,
        followers: Vec<UserRef>,
        following: Vec<UserRef>,
    ) -> Self {
        self.followers.insert(user.id.clone(), followers);
        self.following.insert(user.id.clone(), following);
        self
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

fn take(list: Option<&Vec<FetchedPost>>, limit: usize) -> Vec<FetchedPost> {
    list.map(|l| l.iter().take(limit).cloned().collect())
        .unwrap_or_default()
}

#[async_trait]
impl ScrapeClient for MockClient {
    async fn add_account(&mut self, credential: &Credential) -> Result<(), ScrapeError> {
        self.record(format!("add_account:{}", credential.login));
        if self.rejected_logins.contains(&credential.login) {
            return Err(ScrapeError::InvalidAccount {
                login: credential.login.clone(),
                reason: "rejected".to_string(),
            });
        }
        Ok(())
    }

    async fn login_all(&mut self) -> Result<usize, ScrapeError> {
        self.record("login_all".to_string());
        if self.fail_login {
            return Err(ScrapeError::Unauthorized("verify_session".to_string()));
        }
        Ok(1)
    }

    async fn user_by_login(&self, handle: &str) -> Result<Option<UserRef>, ScrapeError> {
        self.record(format!("user_by_login:{}", handle));
        Ok(self.users.get(handle).cloned())
    }

    async fn user_tweets(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, ScrapeError> {
        self.record(format!("user_tweets:{}", user_id));
        {
            let mut left = self.rate_limits_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(ScrapeError::RateLimited {
                    operation: "user_tweets".to_string(),
                    reset_at: None,
                });
            }
        }
        Ok(take(self.posts.get(user_id), limit))
    }

    async fn user_tweets_and_replies(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, ScrapeError> {
        self.record(format!("user_tweets_and_replies:{}", user_id));
        Ok(take(self.posts_and_replies.get(user_id), limit))
    }

    async fn followers(&self, user_id: &str, limit: usize) -> Result<Vec<UserRef>, ScrapeError> {
        self.record(format!("followers:{}", user_id));
        {
            let mut left = self.follower_failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(ScrapeError::Api {
                    operation: "followers".to_string(),
                    status: 503,
                    message: "over capacity".to_string(),
                });
            }
        }
        {
            let mut left = self.follower_rate_limits_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(ScrapeError::RateLimited {
                    operation: "followers".to_string(),
                    reset_at: None,
                });
            }
        }
        Ok(self
            .followers
            .get(user_id)
            .map(|l| l.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn following(&self, user_id: &str, limit: usize) -> Result<Vec<UserRef>, ScrapeError> {
        self.record(format!("following:{}", user_id));
        Ok(self
            .following
            .get(user_id)
            .map(|l| l.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

fn credential(login: &str) -> Credential {
    Credential {
        login: login.to_string(),
        password: "pw".to_string(),
        email: format!("{}@example.com", login),
        email_password: "mailpw".to_string(),
    }
}

fn post(id: &str, author: &UserRef, hour: u32, reference: PostReference) -> FetchedPost {
    FetchedPost {
        id: id.to_string(),
        author: author.clone(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap(),
        raw_content: format!("text of {}", id),
        lang: "en".to_string(),
        counts: EngagementCounts {
            like_count: Some(1),
            ..EngagementCounts::default()
        },
        reference,
    }
}

fn embedded(id: &str, username: &str) -> EmbeddedPost {
    EmbeddedPost {
        id: id.to_string(),
        username: username.to_string(),
        raw_content: format!("original {}", id),
    }
}

fn targets(handles: &[&str]) -> Vec<String> {
    handles.iter().map(|h| h.to_string()).collect()
}

fn alice() -> UserRef {
    UserRef::new("1", "alice")
}

fn bob() -> UserRef {
    UserRef::new("2", "bob")
}

#[tokio::test]
async fn test_two_credentials_register_then_login_once() {
    let mut client = MockClient::default();
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a"), credential("b")],
        &[],
        10,
        &PacingConfig::default(),
    )
    .await;

    let rows = assert_ok!(rows);
    assert!(rows.is_empty());
    assert_eq!(
        client.calls(),
        vec!["add_account:a", "add_account:b", "login_all"]
    );

    let sleeps = pacer.recorded();
    assert_eq!(sleeps.len(), 2);
    for pause in sleeps {
        assert!(pause >= Duration::from_secs(1) && pause <= Duration::from_secs(3));
    }
}

#[tokio::test]
async fn test_registration_failure_is_tolerated() {
    let mut client = MockClient::default();
    client.rejected_logins.insert("a".to_string());
    let pacer = RecordingPacer::default();

    let result = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a"), credential("b")],
        &[],
        10,
        &PacingConfig::default(),
    )
    .await;

    assert_ok!(result);
    assert_eq!(client.count_calls("login_all"), 1);
    assert_eq!(pacer.recorded().len(), 2);
}

#[tokio::test]
async fn test_login_failure_aborts_the_run() {
    let mut client = MockClient::default().with_user(&alice(), vec![], vec![]);
    client.fail_login = true;
    let pacer = RecordingPacer::default();

    let result = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;

    let err = assert_err!(result);
    assert!(matches!(err, ScrapeError::Unauthorized(_)));
    assert_eq!(client.count_calls("user_by_login"), 0);
}

#[tokio::test]
async fn test_targets_processed_in_list_order() {
    let (alice, bob) = (alice(), bob());
    let mut client = MockClient::default()
        .with_user(&bob, vec![post("20", &bob, 8, PostReference::None)], vec![])
        .with_user(&alice, vec![post("10", &alice, 9, PostReference::None)], vec![]);
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice", "bob"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    let fetches: Vec<String> = client
        .calls()
        .into_iter()
        .filter(|c| c != "add_account:a" && c != "login_all")
        .collect();
    assert_eq!(
        fetches,
        vec![
            "user_by_login:alice",
            "user_tweets:1",
            "user_tweets_and_replies:1",
            "followers:1",
            "following:1",
            "user_by_login:bob",
            "user_tweets:2",
            "user_tweets_and_replies:2",
            "followers:2",
            "following:2",
        ]
    );

    // emission order follows the target list; the sorted table orders by user
    let emitted: Vec<&str> = rows.rows().iter().map(|r| r.user.as_str()).collect();
    assert_eq!(emitted, vec!["alice", "bob"]);

    // one registration pause plus one pause per processed user
    assert_eq!(pacer.recorded().len(), 3);
}

#[tokio::test]
async fn test_unknown_handle_is_skipped() {
    let alice = alice();
    let mut client = MockClient::default().with_user(
        &alice,
        vec![post("10", &alice, 9, PostReference::None)],
        vec![],
    );
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["ghost", "alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    assert_eq!(rows.len(), 1);
    assert_eq!(client.count_calls("user_by_login"), 2);
    assert_eq!(client.count_calls("user_tweets:"), 1);
}

#[tokio::test]
async fn test_duplicate_across_collections_emitted_once() {
    let alice = alice();
    let shared = post("10", &alice, 9, PostReference::None);
    let mut client = MockClient::default()
        .with_user(&alice, vec![shared.clone()], vec![shared])
        .with_follows(&alice, vec![alice.clone()], vec![alice.clone()]);
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    assert_eq!(rows.len(), 1);
    // the kept row comes from the posts fetch, so mutuality is by author id
    assert_eq!(rows.rows()[0].is_mutual_followership, Mutuality::Mutual);
}

#[tokio::test]
async fn test_outsider_posts_are_never_emitted() {
    let alice = alice();
    let carol = UserRef::new("3", "carol");
    let mut client = MockClient::default().with_user(
        &alice,
        vec![post("10", &alice, 9, PostReference::None)],
        vec![post("30", &carol, 7, PostReference::None)],
    );
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    assert_eq!(rows.len(), 1);
    assert!(rows.rows().iter().all(|r| r.user == "alice"));
}

#[tokio::test]
async fn test_rate_limit_triggers_cooldown_then_single_retry() {
    let alice = alice();
    let mut client = MockClient::default().with_user(
        &alice,
        vec![post("10", &alice, 9, PostReference::None)],
        vec![],
    );
    // every backoff attempt is throttled, the call after the cooldown succeeds
    *client.rate_limits_left.lock().unwrap() = 3;
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    assert_eq!(rows.len(), 1);
    assert_eq!(client.count_calls("user_tweets:1"), 4);
    assert!(pacer.recorded().contains(&Duration::from_secs(900)));
}

#[tokio::test]
async fn test_transient_timeline_rate_limit_is_absorbed_by_backoff() {
    let alice = alice();
    let mut client = MockClient::default().with_user(
        &alice,
        vec![post("10", &alice, 9, PostReference::None)],
        vec![],
    );
    *client.rate_limits_left.lock().unwrap() = 1;
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    assert_eq!(rows.len(), 1);
    assert_eq!(client.count_calls("user_tweets:1"), 2);
    assert!(!pacer.recorded().contains(&Duration::from_secs(900)));
}

#[tokio::test]
async fn test_rate_limit_after_cooldown_is_fatal() {
    let alice = alice();
    let mut client = MockClient::default().with_user(&alice, vec![], vec![]);
    *client.rate_limits_left.lock().unwrap() = 4;
    let pacer = RecordingPacer::default();

    let result = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;

    let err = assert_err!(result);
    assert!(err.is_rate_limited());
    assert_eq!(client.count_calls("user_tweets:1"), 4);
    assert_eq!(client.count_calls("followers"), 0);
}

#[tokio::test]
async fn test_follower_rate_limit_is_retried_with_backoff() {
    let alice = alice();
    let mut client = MockClient::default().with_user(
        &alice,
        vec![post("10", &alice, 9, PostReference::None)],
        vec![],
    );
    *client.follower_rate_limits_left.lock().unwrap() = 1;
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    assert_eq!(rows.len(), 1);
    assert_eq!(client.count_calls("followers:1"), 2);
    assert!(pacer.recorded().contains(&Duration::from_secs(1)));
}

#[tokio::test]
async fn test_follow_fetch_failure_is_retried_with_backoff() {
    let alice = alice();
    let mut client = MockClient::default().with_user(
        &alice,
        vec![post("10", &alice, 9, PostReference::None)],
        vec![],
    );
    *client.follower_failures_left.lock().unwrap() = 2;
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    assert_ok!(rows);

    assert_eq!(client.count_calls("followers:1"), 3);
    let sleeps = pacer.recorded();
    assert!(sleeps.contains(&Duration::from_secs(1)));
    assert!(sleeps.contains(&Duration::from_secs(2)));
}

#[tokio::test]
async fn test_rows_have_unique_ids_and_exclusive_flags() {
    let (alice, bob) = (alice(), bob());
    let carol = UserRef::new("3", "carol");
    let posts = vec![
        post("10", &alice, 9, PostReference::None),
        post("11", &alice, 10, PostReference::Retweet(embedded("90", "carol"))),
        post("12", &alice, 11, PostReference::Quote(embedded("91", "dave"))),
    ];
    let posts_and_replies = vec![
        post("10", &alice, 9, PostReference::None),
        post(
            "13",
            &alice,
            12,
            PostReference::Reply(ReplyTarget {
                tweet_id: "30".to_string(),
                username: Some("bob".to_string()),
            }),
        ),
        post(
            "14",
            &alice,
            13,
            PostReference::Reply(ReplyTarget {
                tweet_id: "99".to_string(),
                username: Some("erin".to_string()),
            }),
        ),
        post("30", &carol, 8, PostReference::None),
    ];
    let mut client = MockClient::default()
        .with_user(&alice, posts, posts_and_replies)
        .with_follows(&alice, vec![bob.clone()], vec![bob]);
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows).into_sorted();

    let ids: HashSet<&str> = rows.iter().map(|r| r.tweet_id.as_str()).collect();
    assert_eq!(ids.len(), rows.len());
    assert_eq!(rows.len(), 5);
    for row in &rows {
        let flags = [row.is_retweet, row.is_quote, row.is_reply];
        assert!(flags.iter().filter(|f| **f).count() <= 1);
    }

    let by_id = |id: &str| rows.iter().find(|r| r.tweet_id == id).unwrap();

    let retweet = by_id("11");
    assert_eq!(retweet.original_tweet_id.as_deref(), Some("90"));
    assert_eq!(retweet.original_tweet_user.as_deref(), Some("carol"));
    assert_eq!(retweet.original_tweet_text.as_deref(), Some("original 90"));

    let quote = by_id("12");
    assert!(quote.is_quote);
    assert_eq!(quote.original_tweet_user.as_deref(), Some("dave"));

    // reply target fetched in the same batch: text resolved, handle mutual
    let resolved = by_id("13");
    assert_eq!(resolved.reply_to_text.as_deref(), Some("text of 30"));
    assert_eq!(resolved.original_tweet_id.as_deref(), Some("30"));
    assert_eq!(resolved.is_mutual_followership, Mutuality::Mutual);

    // reply target outside the batch: text absent
    let unresolved = by_id("14");
    assert_eq!(unresolved.reply_to_id.as_deref(), Some("99"));
    assert_eq!(unresolved.reply_to_text, None);
    assert_eq!(unresolved.original_tweet_text, None);
    assert_eq!(unresolved.is_mutual_followership, Mutuality::NotMutual);
}

#[tokio::test]
async fn test_run_writes_sorted_csv() {
    let (alice, bob) = (alice(), bob());
    let mut client = MockClient::default()
        .with_user(&bob, vec![post("20", &bob, 6, PostReference::None)], vec![])
        .with_user(
            &alice,
            vec![
                post("11", &alice, 10, PostReference::None),
                post("10", &alice, 9, PostReference::None),
            ],
            vec![],
        );
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["bob", "alice"]),
        10,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let written = assert_ok!(save_csv(rows, &path));
    assert_eq!(written, 3);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert!(lines[0].starts_with("tweet_id,user,created_at,post_text,lang,ViewCount,"));
    assert!(lines[0].ends_with(",is_mutual_followership"));
    assert!(lines[1].starts_with("10,alice,2024-03-10 09:00:00,"));
    assert!(lines[2].starts_with("11,alice,2024-03-10 10:00:00,"));
    assert!(lines[3].starts_with("20,bob,2024-03-10 06:00:00,"));
}

#[tokio::test]
async fn test_limit_is_passed_to_every_fetch() {
    let alice = alice();
    let posts: Vec<FetchedPost> = (0..5)
        .map(|i| post(&format!("1{}", i), &alice, i, PostReference::None))
        .collect();
    let mut client = MockClient::default().with_user(&alice, posts, vec![]);
    let pacer = RecordingPacer::default();

    let rows = scrape_tweets(
        &mut client,
        &pacer,
        &[credential("a")],
        &targets(&["alice"]),
        2,
        &PacingConfig::default(),
    )
    .await;
    let rows = assert_ok!(rows);

    assert_eq!(rows.len(), 2);
}
