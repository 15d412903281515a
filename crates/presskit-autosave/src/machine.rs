//! Save attempt state machine.
//!
//! ```text
//! Idle ──begin──▶ Pending ──succeed──▶ Succeeded
//!                   │  ▲
//!              fail │  │ resume (after backoff)
//!                   ▼  │
//!                 Retrying(n) ──fail, n == max──▶ Failed
//! ```
//!
//! The machine holds at most one attempt. `begin` refuses while an attempt
//! is pending or waiting to retry, which is what guarantees a single persist
//! call in flight per coordinator. It performs no IO and owns no timers; the
//! coordinators drive it and schedule the delays it returns.

use crate::retry::{RetryPolicy, RetrySnapshot};
use crate::snapshot::Captured;
use presskit_util::Identifier;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What started an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Debounce timer elapsed.
    Auto,
    /// Explicit save request or commit key.
    Manual,
}

/// Outcome of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Pending,
    Success,
    Failed,
}

/// Where the machine currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum SavePhase {
    #[default]
    Idle,
    Pending,
    Retrying {
        retry: u32,
        max: u32,
    },
    Succeeded,
    Failed,
}

impl SavePhase {
    /// Whether an attempt is pending or waiting to retry.
    pub fn is_active(&self) -> bool {
        matches!(self, SavePhase::Pending | SavePhase::Retrying { .. })
    }
}

/// One logical save, spanning its retries.
#[derive(Debug, Clone)]
pub struct SaveAttempt<T> {
    pub id: String,
    pub target: Captured<T>,
    pub trigger: TriggerKind,
    pub retry_count: u32,
    pub outcome: AttemptOutcome,
}

/// What to do after a failed persist call.
#[derive(Debug)]
pub enum Failure<T> {
    /// Wait `delay`, then call [`SaveMachine::resume`].
    Retry {
        delay: Duration,
        retry: u32,
        max: u32,
    },
    /// Retries used up; the attempt is finished.
    Exhausted(SaveAttempt<T>),
    /// No attempt was pending.
    Idle,
}

#[derive(Debug)]
pub struct SaveMachine<T> {
    policy: RetryPolicy,
    attempt: Option<SaveAttempt<T>>,
    phase: SavePhase,
}

impl<T: Clone> SaveMachine<T> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: None,
            phase: SavePhase::Idle,
        }
    }

    pub fn phase(&self) -> SavePhase {
        self.phase
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn attempt(&self) -> Option<&SaveAttempt<T>> {
        self.attempt.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.attempt.is_some()
    }

    pub fn retry_count(&self) -> u32 {
        self.attempt.as_ref().map_or(0, |a| a.retry_count)
    }

    /// Start a new attempt. Returns `None` if one is already active.
    pub fn begin(&mut self, trigger: TriggerKind, target: Captured<T>) -> Option<&SaveAttempt<T>> {
        if self.attempt.is_some() {
            return None;
        }
        self.phase = SavePhase::Pending;
        self.attempt = Some(SaveAttempt {
            id: Identifier::attempt(),
            target,
            trigger,
            retry_count: 0,
            outcome: AttemptOutcome::Pending,
        });
        self.attempt.as_ref()
    }

    /// The pending persist call succeeded.
    pub fn succeed(&mut self) -> Option<SaveAttempt<T>> {
        if self.phase != SavePhase::Pending {
            return None;
        }
        let mut attempt = self.attempt.take()?;
        attempt.outcome = AttemptOutcome::Success;
        self.phase = SavePhase::Succeeded;
        Some(attempt)
    }

    /// The pending persist call failed.
    pub fn fail(&mut self) -> Failure<T> {
        if self.phase != SavePhase::Pending {
            return Failure::Idle;
        }
        let max = self.policy.max_retries;
        let Some(attempt) = self.attempt.as_mut() else {
            return Failure::Idle;
        };

        if attempt.retry_count < max {
            attempt.retry_count += 1;
            let retry = attempt.retry_count;
            self.phase = SavePhase::Retrying { retry, max };
            return Failure::Retry {
                delay: self.policy.delay_for(retry),
                retry,
                max,
            };
        }

        self.phase = SavePhase::Failed;
        match self.attempt.take() {
            Some(mut attempt) => {
                attempt.outcome = AttemptOutcome::Failed;
                Failure::Exhausted(attempt)
            }
            None => Failure::Idle,
        }
    }

    /// Backoff elapsed; go back to `Pending` for the next persist call.
    ///
    /// With [`RetrySnapshot::Latest`] the attempt's target is replaced by
    /// `latest` when one is given.
    pub fn resume(&mut self, latest: Option<&Captured<T>>) -> Option<&SaveAttempt<T>> {
        if !matches!(self.phase, SavePhase::Retrying { .. }) {
            return None;
        }
        let use_latest = self.policy.snapshot == RetrySnapshot::Latest;
        let attempt = self.attempt.as_mut()?;
        if let (true, Some(latest)) = (use_latest, latest) {
            attempt.target = latest.clone();
        }
        self.phase = SavePhase::Pending;
        Some(&*attempt)
    }

    /// End the pending attempt as failed without using up the remaining
    /// retries.
    pub fn give_up(&mut self) -> Option<SaveAttempt<T>> {
        if self.phase != SavePhase::Pending {
            return None;
        }
        let mut attempt = self.attempt.take()?;
        attempt.outcome = AttemptOutcome::Failed;
        self.phase = SavePhase::Failed;
        Some(attempt)
    }

    /// Drop the active attempt without an outcome.
    pub fn abandon(&mut self) -> Option<SaveAttempt<T>> {
        self.phase = SavePhase::Idle;
        self.attempt.take()
    }
}
