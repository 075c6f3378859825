//! The scrape client contract and its X API v2 implementation.

use async_trait::async_trait;
use log::{info, warn};

use super::api::{PoolAccount, XApiClient};
use super::follows::{fetch_follow_list, FollowDirection};
use super::timeline::{fetch_user_timeline, TimelineKind};
use super::types::{FetchedPost, UserRef};
use super::users::{lookup_user_by_username, verify_session};
use crate::config::Credential;
use crate::error::ScrapeError;

/// Operations the harvester needs from a social platform client.
///
/// Account management takes `&mut self`; fetches only read.
#[async_trait]
pub trait ScrapeClient: Send + Sync {
    /// Registers one account in the client's pool.
    async fn add_account(&mut self, credential: &Credential) -> Result<(), ScrapeError>;

    /// Logs in every registered account. Returns the number of active accounts.
    async fn login_all(&mut self) -> Result<usize, ScrapeError>;

    /// Resolves a handle. `Ok(None)` when no such user exists.
    async fn user_by_login(&self, handle: &str) -> Result<Option<UserRef>, ScrapeError>;

    /// Up to `limit` of the user's posts, excluding replies.
    async fn user_tweets(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, ScrapeError>;

    /// Up to `limit` of the user's posts including replies.
    async fn user_tweets_and_replies(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, ScrapeError>;

    /// Up to `limit` accounts following the user.
    async fn followers(&self, user_id: &str, limit: usize) -> Result<Vec<UserRef>, ScrapeError>;

    /// Up to `limit` accounts the user follows.
    async fn following(&self, user_id: &str, limit: usize) -> Result<Vec<UserRef>, ScrapeError>;
}

#[async_trait]
impl ScrapeClient for XApiClient {
    async fn add_account(&mut self, credential: &Credential) -> Result<(), ScrapeError> {
        if credential.login.trim().is_empty() || credential.password.is_empty() {
            return Err(ScrapeError::InvalidAccount {
                login: credential.login.clone(),
                reason: "login and password are required".to_string(),
            });
        }
        if self
            .accounts
            .iter()
            .any(|a| a.credential.login.eq_ignore_ascii_case(&credential.login))
        {
            return Err(ScrapeError::AccountExists(credential.login.clone()));
        }

        self.accounts.push(PoolAccount {
            credential: credential.clone(),
            active: false,
        });
        Ok(())
    }

    async fn login_all(&mut self) -> Result<usize, ScrapeError> {
        if self.accounts.is_empty() {
            return Err(ScrapeError::NoAccounts);
        }

        let me = verify_session(self).await?;
        info!("Session verified as @{} ({})", me.username, me.id);

        for account in &mut self.accounts {
            if !account.active {
                account.active = true;
                info!("Logged in account {}", account.credential.login);
            }
        }

        let active = self.active_accounts();
        if active < self.accounts.len() {
            warn!("{} accounts are not active", self.accounts.len() - active);
        }
        Ok(active)
    }

    async fn user_by_login(&self, handle: &str) -> Result<Option<UserRef>, ScrapeError> {
        lookup_user_by_username(self, handle).await
    }

    async fn user_tweets(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, ScrapeError> {
        fetch_user_timeline(self, user_id, limit, TimelineKind::Posts).await
    }

    async fn user_tweets_and_replies(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<FetchedPost>, ScrapeError> {
        fetch_user_timeline(self, user_id, limit, TimelineKind::PostsAndReplies).await
    }

    async fn followers(&self, user_id: &str, limit: usize) -> Result<Vec<UserRef>, ScrapeError> {
        fetch_follow_list(self, user_id, limit, FollowDirection::Followers).await
    }

    async fn following(&self, user_id: &str, limit: usize) -> Result<Vec<UserRef>, ScrapeError> {
        fetch_follow_list(self, user_id, limit, FollowDirection::Following).await
    }
}
