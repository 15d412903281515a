//! User-facing notifications.
//!
//! Coordinators never render anything. They hand a [`Toast`] to whatever
//! [`Notifier`] they were built with: the event [`crate::Bus`], a log line,
//! or a test collector.

use crate::machine::{AttemptOutcome, TriggerKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    /// A manual save completed.
    pub fn saved() -> Self {
        Self::new("Saved", "Your changes have been saved.", Severity::Success)
    }

    /// An attempt failed and retry `retry` of `max` is scheduled.
    pub fn retrying(retry: u32, max: u32) -> Self {
        Self::new(
            "Save failed",
            format!("Retrying... (attempt {retry} of {max})"),
            Severity::Warning,
        )
    }

    /// Saving gave up; the user has to save by hand.
    pub fn exhausted() -> Self {
        Self::new(
            "Save failed",
            "Your changes could not be saved. Please try saving manually.",
            Severity::Error,
        )
    }

    /// A field commit failed.
    pub fn field_failed() -> Self {
        Self::new("Error", "Save failed, please try again.", Severity::Error)
    }
}

/// Summary of a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSettled {
    pub coordinator_id: String,
    pub attempt_id: String,
    pub trigger: TriggerKind,
    pub outcome: AttemptOutcome,
    pub retries: u32,
    /// The content changed while the attempt was in flight.
    pub stale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Receives notifications from coordinators.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, toast: Toast);

    /// Called once per finished attempt. Ignored by default.
    async fn settled(&self, _report: SaveSettled) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _toast: Toast) {}
}

/// Writes toasts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, toast: Toast) {
        match toast.severity {
            Severity::Error => error!(title = %toast.title, "{}", toast.description),
            Severity::Warning => warn!(title = %toast.title, "{}", toast.description),
            Severity::Info | Severity::Success => {
                info!(title = %toast.title, "{}", toast.description)
            }
        }
    }
}
