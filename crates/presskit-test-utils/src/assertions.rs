//! Assertion helpers for paused-clock tests.

use std::time::Duration;
use tokio::time::Instant;

/// Assert that `later` happened at least `min` after `earlier`.
pub fn assert_elapsed_at_least(earlier: Instant, later: Instant, min: Duration) {
    let gap = later.saturating_duration_since(earlier);
    assert!(
        gap >= min,
        "Expected at least {:?} between events, got {:?}",
        min,
        gap
    );
}

/// Let spawned tasks run and timers fire for `duration` of tokio time.
///
/// With a paused clock this returns instantly in wall time.
pub async fn run_for(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Yield to the scheduler a few times so queued commands get processed
/// without moving the clock.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
