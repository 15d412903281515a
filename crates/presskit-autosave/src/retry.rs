//! Retry policy with exponential backoff.
//!
//! Retry `n` waits `initial * factor^(n - 1)`: 2s, 4s, 8s with the defaults.

use crate::config::AutoSaveConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Initial retry delay in milliseconds.
pub const RETRY_INITIAL_DELAY_MS: u64 = 2000;

/// Backoff factor for exponential delay.
pub const RETRY_BACKOFF_FACTOR: u32 = 2;

/// Upper bound for a single retry delay.
pub const RETRY_MAX_DELAY_MS: u64 = 30_000;

/// Maximum number of retries after the first attempt.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Delay before retry `retry` (1-based) with the default constants.
pub fn calculate_delay(retry: u32) -> Duration {
    backoff(
        RETRY_INITIAL_DELAY_MS,
        RETRY_BACKOFF_FACTOR,
        RETRY_MAX_DELAY_MS,
        retry,
    )
}

fn backoff(initial_ms: u64, factor: u32, max_ms: u64, retry: u32) -> Duration {
    let multiplier = u64::from(factor).saturating_pow(retry.saturating_sub(1));
    let delay = initial_ms.saturating_mul(multiplier);
    Duration::from_millis(delay.min(max_ms))
}

/// Whole milliseconds in `duration`, clamped to `u64::MAX`.
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Which snapshot a retry persists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrySnapshot {
    /// The snapshot the failed attempt tried to save.
    #[default]
    Original,
    /// Whatever the current snapshot is when the retry fires.
    Latest,
}

/// Retry settings for one coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: u32,
    pub max_delay: Duration,
    pub snapshot: RetrySnapshot,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn from_config(config: &AutoSaveConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            backoff_factor: config.retry_backoff_factor,
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
            snapshot: config.retry_snapshot,
        }
    }

    /// Delay before retry `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        backoff(
            saturating_millis(self.initial_delay),
            self.backoff_factor,
            saturating_millis(self.max_delay),
            retry,
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: RETRY_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(RETRY_INITIAL_DELAY_MS),
            backoff_factor: RETRY_BACKOFF_FACTOR,
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
            snapshot: RetrySnapshot::Original,
        }
    }
}
