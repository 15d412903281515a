//! A scriptable persist capability.

use async_trait::async_trait;
use presskit_autosave::{Persist, PersistError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Result of one scripted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Succeed,
    Fail,
}

/// A recorded persist call.
#[derive(Debug, Clone)]
pub struct PersistCall<T> {
    pub value: T,
    /// When the call started, on the tokio clock.
    pub at: Instant,
}

/// Records every persist call and answers from a script.
///
/// Queued steps are consumed in order; once the queue is empty every call
/// gets the fallback (success unless built with [`RecordingPersist::failing`]).
///
/// # Example
///
/// ```rust,ignore
/// let persist = RecordingPersist::<Draft>::new()
///     .then_fail(2)
///     .with_latency(Duration::from_millis(300));
/// // call 1: fail, call 2: fail, call 3+: succeed
/// ```
pub struct RecordingPersist<T> {
    calls: Mutex<Vec<PersistCall<T>>>,
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    latency: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl<T: Clone + Send + Sync + 'static> RecordingPersist<T> {
    /// Succeeds on every call.
    pub fn new() -> Self {
        Self::with_fallback(Step::Succeed)
    }

    /// Fails on every call.
    pub fn failing() -> Self {
        Self::with_fallback(Step::Fail)
    }

    fn with_fallback(fallback: Step) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            fallback,
            latency: Duration::ZERO,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Queue `n` failures.
    pub fn then_fail(self, n: usize) -> Self {
        self.queue(Step::Fail, n)
    }

    /// Queue `n` successes.
    pub fn then_succeed(self, n: usize) -> Self {
        self.queue(Step::Succeed, n)
    }

    fn queue(self, step: Step, n: usize) -> Self {
        self.script
            .lock()
            .unwrap()
            .extend(std::iter::repeat(step).take(n));
        self
    }

    /// Each call takes `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<PersistCall<T>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn values(&self) -> Vec<T> {
        self.calls().into_iter().map(|c| c.value).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Calls that have returned.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Largest number of calls that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Time between the starts of consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        self.calls()
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for RecordingPersist<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> Persist<T> for RecordingPersist<T> {
    async fn persist(&self, value: T) -> Result<(), PersistError> {
        self.calls.lock().unwrap().push(PersistCall {
            value,
            at: Instant::now(),
        });
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        match step {
            Step::Succeed => Ok(()),
            Step::Fail => Err(PersistError::new("scripted failure")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_fallback() {
        let persist = RecordingPersist::<u32>::new().then_fail(1).then_succeed(1);

        assert!(persist.persist(1).await.is_err());
        assert!(persist.persist(2).await.is_ok());
        assert!(persist.persist(3).await.is_ok());
        assert_eq!(persist.values(), vec![1, 2, 3]);
        assert_eq!(persist.completed(), 3);
    }

    #[tokio::test]
    async fn test_failing() {
        let persist = RecordingPersist::<u32>::failing().then_succeed(1);
        assert!(persist.persist(1).await.is_ok());
        assert!(persist.persist(2).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_and_gaps() {
        let persist = RecordingPersist::<u32>::new().with_latency(Duration::from_millis(300));

        persist.persist(1).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        persist.persist(2).await.unwrap();

        assert_eq!(persist.gaps(), vec![Duration::from_millis(1300)]);
        assert_eq!(persist.peak_concurrency(), 1);
    }
}
