//! Drop guard that logs how long a persist call took.
//!
//! ```rust,ignore
//! let _timing = TimingGuard::persist("document");
//! persist.persist(&draft).await?;
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Calls faster than this are logged at debug level.
const NOTICEABLE: Duration = Duration::from_millis(100);
/// Calls slower than this are logged as warnings.
const SLOW: Duration = Duration::from_secs(5);

pub struct TimingGuard {
    kind: &'static str,
    label: String,
    started: Instant,
}

impl TimingGuard {
    pub fn new(kind: &'static str, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn persist(label: impl Into<String>) -> Self {
        Self::new("persist", label)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Render a duration as `250ms`, `2.50s` or `1m 1.0s`.
fn human(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    match ms {
        0..=999 => format!("{ms}ms"),
        1000..=59_999 => format!("{:.2}s", elapsed.as_secs_f64()),
        _ => format!("{}m {:.1}s", ms / 60_000, (ms % 60_000) as f64 / 1000.0),
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        let took = human(elapsed);
        let (kind, label) = (self.kind, self.label.as_str());
        if elapsed >= SLOW {
            warn!(kind, label, took = %took, "Slow {kind} call");
        } else if elapsed >= NOTICEABLE {
            info!(kind, label, took = %took, "Finished {kind} call");
        } else {
            debug!(kind, label, took = %took, "Finished {kind} call");
        }
    }
}
