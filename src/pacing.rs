//! Delay policy for pauses, backoff sleeps and the rate-limit cooldown.
//!
//! Every wait in a run goes through a [`Pacer`], so tests can swap in a pacer
//! that records the requested durations instead of sleeping.

use async_trait::async_trait;
use log::debug;
use rand::Rng;
use std::time::Duration;

/// Timing knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    /// Lower bound of the random pause between accounts and between users
    pub pause_min: Duration,
    /// Upper bound of the random pause
    pub pause_max: Duration,
    /// First backoff delay; doubled after every failed attempt
    pub initial_backoff: Duration,
    /// Total attempts made by the backoff wrapper
    pub retries: u32,
    /// Wait after a rate-limit failure before the single retry
    pub cooldown: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            pause_min: Duration::from_secs(1),
            pause_max: Duration::from_secs(3),
            initial_backoff: Duration::from_secs(1),
            retries: 3,
            cooldown: Duration::from_secs(900),
        }
    }
}

/// Strategy for waiting.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Suspends the run for `duration`.
    async fn sleep(&self, duration: Duration);

    /// Picks a pause length between `min` and `max` inclusive.
    fn jitter(&self, min: Duration, max: Duration) -> Duration {
        if max <= min {
            return min;
        }
        let secs = rand::thread_rng().gen_range(min.as_secs_f64()..=max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Sleeps a random duration within the configured pause bounds.
pub async fn random_pause(pacer: &dyn Pacer, config: &PacingConfig) {
    let pause = pacer.jitter(config.pause_min, config.pause_max);
    debug!("Pausing for {:.2}s", pause.as_secs_f64());
    pacer.sleep(pause).await;
}

/// Production pacer backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingPacer;
    use super::*;

    #[test]
    fn test_jitter_stays_within_bounds() {
        let pacer = RecordingPacer::default();
        let min = Duration::from_secs(1);
        let max = Duration::from_secs(3);
        for _ in 0..100 {
            let pause = pacer.jitter(min, max);
            assert!(pause >= min && pause <= max);
        }
    }

    #[test]
    fn test_jitter_degenerate_range() {
        let pacer = RecordingPacer::default();
        assert_eq!(
            pacer.jitter(Duration::from_secs(2), Duration::from_secs(1)),
            Duration::from_secs(2)
        );
        assert_eq!(pacer.jitter(Duration::ZERO, Duration::ZERO), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_random_pause_records_one_sleep() {
        let pacer = RecordingPacer::default();
        random_pause(&pacer, &PacingConfig::default()).await;

        let sleeps = pacer.recorded();
        assert_eq!(sleeps.len(), 1);
        assert!(sleeps[0] >= Duration::from_secs(1) && sleeps[0] <= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_tokio_pacer_zero_sleep_returns() {
        TokioPacer.sleep(Duration::ZERO).await;
    }
}
