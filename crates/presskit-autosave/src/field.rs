//! Single-field save on commit.
//!
//! A text field persists its value when the commit key (Enter without Shift)
//! is pressed. There is no debounce and no retry: a failure shows a toast and
//! leaves the user to try again. After a success the field can show a
//! transient "saved" indicator.

use crate::config::AutoSaveConfig;
use crate::document::{elapsed, join, PersistOutcome};
use crate::error::{AutoSaveError, AutoSaveResult, PersistError};
use crate::machine::{Failure, SaveAttempt, SaveMachine, TriggerKind};
use crate::notify::{LogNotifier, Notifier, SaveSettled, Toast};
use crate::persist::Persist;
use crate::retry::RetryPolicy;
use crate::snapshot::Captured;
use crate::state::FieldState;
use presskit_util::{Identifier, TimingGuard};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Tab,
    Backspace,
    Char(char),
    Other,
}

/// A key press as delivered by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Enter without Shift. Shift+Enter inserts a newline instead.
    pub fn is_commit(&self) -> bool {
        self.key == Key::Enter && !self.shift
    }
}

/// What the input layer should do with the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key was consumed as a commit; suppress its default action.
    Committed,
    /// Not ours; handle normally.
    Ignored,
}

/// Builder for [`FieldAutoSave`].
pub struct FieldAutoSaveBuilder {
    persist: Arc<dyn Persist<String>>,
    show_success_indicator: bool,
    success_indicator: Duration,
    notifier: Arc<dyn Notifier>,
    label: String,
}

impl FieldAutoSaveBuilder {
    /// Take the indicator settings from a config.
    pub fn config(mut self, config: &AutoSaveConfig) -> Self {
        self.show_success_indicator = config.show_success_indicator;
        self.success_indicator = config.success_indicator();
        self
    }

    pub fn show_success_indicator(mut self, show: bool) -> Self {
        self.show_success_indicator = show;
        self
    }

    pub fn success_indicator(mut self, duration: Duration) -> Self {
        self.success_indicator = duration;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Start the coordinator task. Must be called from within a tokio runtime.
    pub fn spawn(self) -> FieldAutoSave {
        let id = Identifier::coordinator();
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(watch::Sender::new(FieldState::default()));
        let cancel = CancellationToken::new();

        let worker = FieldWorker {
            id: id.clone(),
            label: self.label,
            show_success_indicator: self.show_success_indicator,
            success_indicator: self.success_indicator,
            persist: self.persist,
            notifier: self.notifier,
            state: Arc::clone(&state),
            machine: SaveMachine::new(RetryPolicy::none()),
            in_flight: None,
            indicator: None,
            commits: rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());

        FieldAutoSave {
            id,
            commits: tx,
            state,
            cancel,
            task: Some(task),
        }
    }
}

/// Handle to a running field coordinator.
pub struct FieldAutoSave {
    id: String,
    commits: mpsc::UnboundedSender<String>,
    state: Arc<watch::Sender<FieldState>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl FieldAutoSave {
    pub fn builder(persist: Arc<dyn Persist<String>>) -> FieldAutoSaveBuilder {
        let defaults = AutoSaveConfig::default();
        FieldAutoSaveBuilder {
            persist,
            show_success_indicator: defaults.show_success_indicator,
            success_indicator: defaults.success_indicator(),
            notifier: Arc::new(LogNotifier),
            label: "field".to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Feed a key press. On the commit key, `value` is persisted.
    pub fn handle_key(&self, key: &KeyPress, value: &str) -> AutoSaveResult<KeyOutcome> {
        if !key.is_commit() {
            return Ok(KeyOutcome::Ignored);
        }
        self.commit(value)?;
        Ok(KeyOutcome::Committed)
    }

    /// Persist `value` now. Dropped while a previous commit is still saving.
    pub fn commit(&self, value: &str) -> AutoSaveResult<()> {
        self.state
            .send_if_modified(|s| !std::mem::replace(&mut s.is_saving, true));
        self.commits
            .send(value.to_string())
            .map_err(|_| AutoSaveError::Closed)
    }

    pub fn state(&self) -> FieldState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FieldState> {
        self.state.subscribe()
    }

    /// Stop the coordinator and wait for its task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(coordinator = %self.id, error = %e, "Field task ended abnormally");
            }
        }
    }
}

impl Drop for FieldAutoSave {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct FieldWorker {
    id: String,
    label: String,
    show_success_indicator: bool,
    success_indicator: Duration,
    persist: Arc<dyn Persist<String>>,
    notifier: Arc<dyn Notifier>,
    state: Arc<watch::Sender<FieldState>>,
    machine: SaveMachine<String>,
    in_flight: Option<JoinHandle<PersistOutcome>>,
    indicator: Option<Pin<Box<Sleep>>>,
    commits: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
}

impl FieldWorker {
    async fn run(mut self) {
        debug!(coordinator = %self.id, label = %self.label, "Field auto-save started");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                value = self.commits.recv() => match value {
                    Some(value) => self.commit(value),
                    None => break,
                },

                result = join(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.settle(result).await;
                }

                _ = elapsed(&mut self.indicator) => {
                    self.indicator = None;
                    self.publish(|s| s.show_success = false);
                }
            }
        }

        debug!(coordinator = %self.id, "Field auto-save stopped");
    }

    fn commit(&mut self, value: String) {
        if self.machine.is_busy() {
            debug!(coordinator = %self.id, "Commit while saving, dropped");
            return;
        }

        self.indicator = None;
        let target = match Captured::new(value) {
            Ok(target) => target,
            Err(e) => {
                warn!(coordinator = %self.id, error = %e, "Field value not serializable");
                self.publish(|s| s.is_saving = false);
                return;
            }
        };
        let Some(attempt) = self.machine.begin(TriggerKind::Manual, target) else {
            return;
        };
        let value = attempt.target.value.clone();
        debug!(coordinator = %self.id, attempt_id = %attempt.id, "Saving field");

        self.publish(|s| {
            s.is_saving = true;
            s.show_success = false;
        });

        let persist = Arc::clone(&self.persist);
        let label = self.label.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let _timing = TimingGuard::persist(label);
            persist.persist(value).await
        }));
    }

    async fn settle(&mut self, result: Result<PersistOutcome, JoinError>) {
        let outcome = result
            .unwrap_or_else(|e| Err(PersistError::with_source("persist task failed", e)));

        match outcome {
            Ok(()) => {
                let Some(attempt) = self.machine.succeed() else {
                    return;
                };
                let show = self.show_success_indicator;
                self.publish(|s| {
                    s.is_saving = false;
                    s.show_success = show;
                });
                if show {
                    self.indicator = Some(Box::pin(sleep(self.success_indicator)));
                }
                debug!(coordinator = %self.id, attempt_id = %attempt.id, "Field saved");
                self.notifier.settled(self.report(&attempt, None)).await;
            }
            Err(err) => {
                let Failure::Exhausted(attempt) = self.machine.fail() else {
                    return;
                };
                warn!(coordinator = %self.id, attempt_id = %attempt.id, error = %err, "Field save failed");
                self.publish(|s| s.is_saving = false);
                self.notifier.notify(Toast::field_failed()).await;
                self.notifier
                    .settled(self.report(&attempt, Some(err.to_string())))
                    .await;
            }
        }
    }

    fn report(&self, attempt: &SaveAttempt<String>, error: Option<String>) -> SaveSettled {
        SaveSettled {
            coordinator_id: self.id.clone(),
            attempt_id: attempt.id.clone(),
            trigger: attempt.trigger,
            outcome: attempt.outcome,
            retries: 0,
            stale: false,
            error,
        }
    }

    fn publish(&self, update: impl FnOnce(&mut FieldState)) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.state.send_if_modified(|state| {
            let before = *state;
            update(state);
            *state != before
        });
    }
}
