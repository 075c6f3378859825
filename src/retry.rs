//! Fetch wrappers: bounded exponential backoff and the rate-limit cooldown.

use log::{info, warn};
use std::future::Future;

use crate::error::ScrapeError;
use crate::pacing::{Pacer, PacingConfig};

/// Runs `operation` up to `config.retries` times.
///
/// After each failed attempt except the last, sleeps the current delay
/// (starting at `config.initial_backoff`) and doubles it. Every error kind is
/// retried, rate limits included. The last failure is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    pacer: &dyn Pacer,
    config: &PacingConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let attempts = config.retries.max(1);
    let mut delay = config.initial_backoff;

    for attempt in 1..=attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(
                    "Operation '{}' failed (attempt {}/{}): {} - retrying in {}s",
                    operation_name,
                    attempt,
                    attempts,
                    e,
                    delay.as_secs_f64()
                );
                pacer.sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    unreachable!("backoff loop returns on the last attempt")
}

/// Runs `operation` through [`retry_with_backoff`], falling back once on a
/// rate-limit failure.
///
/// When the backoff gives up on a rate-limit failure this logs a warning,
/// sleeps `config.cooldown`, and calls `operation` exactly once more without
/// any backoff. Whatever that call
/// returns is the result.
pub async fn with_cooldown<T, F, Fut>(
    pacer: &dyn Pacer,
    config: &PacingConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    match retry_with_backoff(pacer, config, operation_name, &mut operation).await {
        Err(e) if e.is_rate_limited() => {
            warn!("Rate limit hit, waiting before retrying: {}", e);
            pacer.sleep(config.cooldown).await;
            info!("Cooldown finished, retrying '{}' once", operation_name);
            operation().await
        }
        result => result,
    }
}
