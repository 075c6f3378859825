//! Account pool initialization.

use log::{error, info, warn};

use crate::config::Credential;
use crate::error::ScrapeError;
use crate::pacing::{random_pause, Pacer, PacingConfig};
use crate::twitter::ScrapeClient;

/// Outcome of registering the credential list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolSummary {
    pub attempted: usize,
    pub added: usize,
    pub failed: usize,
}

/// Registers every credential with `client`, then logs the whole pool in.
///
/// A failed registration is logged and skipped. Each attempt, successful or
/// not, is followed by a random pause. The final `login_all` is not
/// tolerated: its error is returned and the run must stop.
pub async fn register_accounts(
    client: &mut dyn ScrapeClient,
    pacer: &dyn Pacer,
    config: &PacingConfig,
    credentials: &[Credential],
) -> Result<PoolSummary, ScrapeError> {
    let mut summary = PoolSummary::default();

    for credential in credentials {
        summary.attempted += 1;
        match client.add_account(credential).await {
            Ok(()) => {
                info!("Added account {}", credential.login);
                summary.added += 1;
            }
            Err(e) => {
                warn!("Failed to add account {}: {}", credential.login, e);
                summary.failed += 1;
            }
        }
        random_pause(pacer, config).await;
    }

    info!(
        "Account registration finished: {} attempted, {} added, {} failed",
        summary.attempted, summary.added, summary.failed
    );

    match client.login_all().await {
        Ok(active) => {
            info!("Logged in {} accounts", active);
            Ok(summary)
        }
        Err(e) => {
            error!("Login failed: {}", e);
            Err(e)
        }
    }
}
