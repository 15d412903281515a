//! Wall-clock source for `last_saved` timestamps.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Supplies the timestamp recorded when a save completes.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall time anchored to the tokio clock.
///
/// The wall time is captured once at construction and advanced by the tokio
/// monotonic clock afterwards, so paused-time tests see timestamps that move
/// with `tokio::time::advance`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    wall: DateTime<Utc>,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            wall: Utc::now(),
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.anchor.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}
