//! Document auto-save coordinator.
//!
//! [`DocumentAutoSave`] is a handle to a tokio task that owns the debounce
//! timer, the retry timer and the in-flight persist call. The handle detects
//! changes itself, so `has_unsaved_changes` is already true when
//! [`DocumentAutoSave::update`] returns; everything time-based happens in the
//! task.
//!
//! Dropping the handle (or calling [`DocumentAutoSave::shutdown`]) cancels
//! both timers. A persist call that is already running is detached: it runs
//! to completion but its result is ignored and the state is never touched
//! again.

use crate::clock::{Clock, SystemClock};
use crate::config::AutoSaveConfig;
use crate::error::{AutoSaveError, AutoSaveResult, PersistError};
use crate::machine::{Failure, SaveAttempt, SaveMachine, SavePhase, TriggerKind};
use crate::notify::{LogNotifier, Notifier, SaveSettled, Toast};
use crate::persist::Persist;
use crate::snapshot::{Captured, ChangeDetector, Observation, Snapshot};
use crate::state::SaveState;
use presskit_util::{Identifier, TimingGuard};
use std::future::pending;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep, Sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub(crate) type PersistOutcome = Result<(), PersistError>;

enum Command<T> {
    /// `revision` is set when the handle detected a change.
    Snapshot {
        captured: Captured<T>,
        revision: Option<u64>,
    },
    Save,
    SetEnabled(bool),
}

/// Builder for [`DocumentAutoSave`].
pub struct DocumentAutoSaveBuilder<T: Snapshot> {
    persist: Arc<dyn Persist<T>>,
    config: AutoSaveConfig,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    label: String,
}

impl<T: Snapshot> DocumentAutoSaveBuilder<T> {
    pub fn config(mut self, config: AutoSaveConfig) -> Self {
        self.config = config;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Name used in timing and log output.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Start the coordinator task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self) -> DocumentAutoSave<T> {
        let id = Identifier::coordinator();
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(watch::Sender::new(SaveState::default()));
        let revision = Arc::new(AtomicU64::new(0));
        let cancel = CancellationToken::new();

        let worker = Worker {
            id: id.clone(),
            label: self.label,
            enabled: self.config.enabled,
            delay: self.config.delay(),
            persist: self.persist,
            notifier: self.notifier,
            clock: self.clock,
            state: Arc::clone(&state),
            revision: Arc::clone(&revision),
            seen_revision: 0,
            machine: SaveMachine::new(self.config.retry_policy()),
            current: None,
            debounce: None,
            retry: None,
            in_flight: None,
            commands: rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run());

        DocumentAutoSave {
            id,
            enabled: self.config.enabled,
            detector: ChangeDetector::new(),
            commands: tx,
            state,
            revision,
            cancel,
            task: Some(task),
        }
    }
}

/// Handle to a running document coordinator.
pub struct DocumentAutoSave<T: Snapshot> {
    id: String,
    enabled: bool,
    detector: ChangeDetector,
    commands: mpsc::UnboundedSender<Command<T>>,
    state: Arc<watch::Sender<SaveState>>,
    revision: Arc<AtomicU64>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<T: Snapshot> DocumentAutoSave<T> {
    pub fn builder(persist: Arc<dyn Persist<T>>) -> DocumentAutoSaveBuilder<T> {
        DocumentAutoSaveBuilder {
            persist,
            config: AutoSaveConfig::default(),
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock::new()),
            label: "document".to_string(),
        }
    }

    pub fn new(persist: Arc<dyn Persist<T>>, config: AutoSaveConfig) -> Self {
        Self::builder(persist).config(config).spawn()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Report the current snapshot.
    ///
    /// The first snapshot is the baseline. Later ones that differ structurally
    /// mark the document dirty and restart the debounce timer. Returns whether
    /// a change was detected.
    ///
    /// While disabled, snapshots are still recorded for manual saves, but the
    /// baseline does not move: the first update after re-enabling compares
    /// against the last snapshot seen while enabled.
    pub fn update(&mut self, snapshot: T) -> AutoSaveResult<bool> {
        let captured = Captured::new(snapshot)?;
        let changed = if self.enabled || !self.detector.has_baseline() {
            self.detector.observe(&captured.fingerprint) == Observation::Changed
        } else {
            false
        };

        let revision = changed.then(|| {
            let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
            self.state
                .send_if_modified(|s| !std::mem::replace(&mut s.has_unsaved_changes, true));
            revision
        });
        self.send(Command::Snapshot { captured, revision })?;
        Ok(changed)
    }

    /// Save now, bypassing the debounce. A no-op when there is nothing to
    /// save, and dropped if an attempt is already in flight.
    pub fn trigger_save(&self) -> AutoSaveResult<()> {
        if !self.state.borrow().has_unsaved_changes {
            debug!(coordinator = %self.id, "Manual save requested with no changes");
            return Ok(());
        }
        self.send(Command::Save)
    }

    /// Override the dirty flag.
    pub fn set_unsaved_changes(&self, value: bool) {
        self.state
            .send_if_modified(|s| std::mem::replace(&mut s.has_unsaved_changes, value) != value);
    }

    /// Turn automatic saving on or off.
    ///
    /// Disabling cancels the debounce timer and any retry that is waiting.
    pub fn set_enabled(&mut self, enabled: bool) -> AutoSaveResult<()> {
        self.enabled = enabled;
        self.send(Command::SetEnabled(enabled))
    }

    pub fn state(&self) -> SaveState {
        self.state.borrow().clone()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.state.subscribe()
    }

    /// Stop the coordinator and wait for its task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(coordinator = %self.id, error = %e, "Auto-save task ended abnormally");
            }
        }
    }

    fn send(&self, command: Command<T>) -> AutoSaveResult<()> {
        self.commands
            .send(command)
            .map_err(|_| AutoSaveError::Closed)
    }
}

impl<T: Snapshot> Drop for DocumentAutoSave<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker<T: Snapshot> {
    id: String,
    label: String,
    enabled: bool,
    delay: Duration,
    persist: Arc<dyn Persist<T>>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<SaveState>>,
    /// Bumped by the handle on every detected change.
    revision: Arc<AtomicU64>,
    /// Revision of the last snapshot command handled here.
    seen_revision: u64,
    machine: SaveMachine<T>,
    current: Option<Captured<T>>,
    debounce: Option<Pin<Box<Sleep>>>,
    retry: Option<Pin<Box<Sleep>>>,
    in_flight: Option<JoinHandle<PersistOutcome>>,
    commands: mpsc::UnboundedReceiver<Command<T>>,
    cancel: CancellationToken,
}

impl<T: Snapshot> Worker<T> {
    async fn run(mut self) {
        debug!(coordinator = %self.id, label = %self.label, "Auto-save started");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },

                result = join(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.settle(result).await;
                }

                _ = elapsed(&mut self.retry) => {
                    self.retry = None;
                    self.resume();
                }

                _ = elapsed(&mut self.debounce) => {
                    self.debounce = None;
                    self.debounce_elapsed();
                }
            }
        }

        if self.in_flight.is_some() {
            debug!(coordinator = %self.id, "Detaching in-flight persist");
        }
        debug!(coordinator = %self.id, "Auto-save stopped");
    }

    fn handle(&mut self, command: Command<T>) {
        match command {
            Command::Snapshot { captured, revision } => {
                self.current = Some(captured);
                if let Some(revision) = revision {
                    self.seen_revision = revision;
                    if self.enabled {
                        self.debounce = Some(Box::pin(sleep(self.delay)));
                    }
                }
            }
            Command::Save => self.save_now(),
            Command::SetEnabled(enabled) => self.set_enabled(enabled),
        }
    }

    fn save_now(&mut self) {
        if !self.state.borrow().has_unsaved_changes {
            debug!(coordinator = %self.id, "Manual save requested with no changes");
            return;
        }
        if self.machine.is_busy() {
            debug!(coordinator = %self.id, "Save already in flight, dropping manual save");
            return;
        }
        self.debounce = None;
        self.start(TriggerKind::Manual);
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        debug!(coordinator = %self.id, enabled, "Auto-save toggled");
        if enabled {
            return;
        }

        self.debounce = None;
        if self.retry.take().is_some() {
            self.abandon("auto-save disabled during retry backoff");
        }
    }

    fn debounce_elapsed(&mut self) {
        if !self.enabled {
            return;
        }
        if !self.state.borrow().has_unsaved_changes {
            debug!(coordinator = %self.id, "Debounce elapsed with nothing to save");
            return;
        }
        self.start(TriggerKind::Auto);
    }

    fn start(&mut self, trigger: TriggerKind) {
        let Some(target) = self.current.clone() else {
            debug!(coordinator = %self.id, "No snapshot recorded yet");
            return;
        };
        let Some(attempt) = self.machine.begin(trigger, target) else {
            debug!(coordinator = %self.id, ?trigger, "Save already in flight, dropping trigger");
            return;
        };
        let attempt_id = attempt.id.clone();
        let value = attempt.target.value.clone();
        debug!(
            coordinator = %self.id,
            attempt_id = %attempt_id,
            ?trigger,
            fingerprint = attempt.target.fingerprint.short(),
            "Starting save"
        );

        self.publish(|s| {
            s.is_saving = true;
            s.retry_count = 0;
            s.phase = SavePhase::Pending;
        });
        self.spawn_persist(value);
    }

    fn resume(&mut self) {
        let Some(attempt) = self.machine.resume(self.current.as_ref()) else {
            return;
        };
        let value = attempt.target.value.clone();
        debug!(
            coordinator = %self.id,
            attempt_id = %attempt.id,
            retry_count = attempt.retry_count,
            "Retrying save"
        );

        self.publish(|s| s.phase = SavePhase::Pending);
        self.spawn_persist(value);
    }

    fn spawn_persist(&mut self, value: T) {
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
            Ok(()) => self.succeeded().await,
            Err(err) => self.failed(err).await,
        }
    }

    async fn succeeded(&mut self) {
        let Some(attempt) = self.machine.succeed() else {
            return;
        };
        let stale = self
            .current
            .as_ref()
            .is_some_and(|current| current.fingerprint != attempt.target.fingerprint);
        let now = self.clock.now();
        let revision = Arc::clone(&self.revision);
        let seen = self.seen_revision;

        // Under the state lock. The handle bumps the revision before it
        // marks the document dirty.
        self.publish(move |s| {
            s.is_saving = false;
            s.retry_count = 0;
            s.last_saved = Some(now);
            s.phase = SavePhase::Succeeded;
            if !stale && revision.load(Ordering::SeqCst) == seen {
                s.has_unsaved_changes = false;
            }
        });
        info!(
            coordinator = %self.id,
            attempt_id = %attempt.id,
            trigger = ?attempt.trigger,
            retry_count = attempt.retry_count,
            stale,
            "Saved"
        );

        if stale && self.enabled {
            debug!(coordinator = %self.id, "Content changed during save, saving again");
            self.debounce = Some(Box::pin(sleep(self.delay)));
        }
        if attempt.trigger == TriggerKind::Manual {
            self.notifier.notify(Toast::saved()).await;
        }
        self.notifier
            .settled(self.report(&attempt, stale, None))
            .await;
    }

    async fn failed(&mut self, err: PersistError) {
        if !self.enabled {
            match self.machine.give_up() {
                Some(attempt) => {
                    warn!(coordinator = %self.id, error = %err, "Save failed while auto-save is disabled");
                    self.exhausted(attempt, err).await;
                }
                None => debug!(coordinator = %self.id, "Persist result with no active attempt"),
            }
            return;
        }

        match self.machine.fail() {
            Failure::Retry { delay, retry, max } => {
                warn!(
                    coordinator = %self.id,
                    error = %err,
                    retry_count = retry,
                    max_retries = max,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Save failed, scheduling retry"
                );
                self.publish(|s| {
                    s.retry_count = retry;
                    s.phase = SavePhase::Retrying { retry, max };
                });
                self.retry = Some(Box::pin(sleep(delay)));
                self.notifier.notify(Toast::retrying(retry, max)).await;
            }
            Failure::Exhausted(attempt) => self.exhausted(attempt, err).await,
            Failure::Idle => {
                debug!(coordinator = %self.id, "Persist result with no active attempt");
            }
        }
    }

    /// Terminal failure: the document stays dirty and the user is told to
    /// save by hand.
    async fn exhausted(&mut self, attempt: SaveAttempt<T>, err: PersistError) {
        let last_error = err.to_string();
        let err = AutoSaveError::RetriesExhausted {
            retries: attempt.retry_count,
            last: err,
        };
        error!(
            coordinator = %self.id,
            attempt_id = %attempt.id,
            error = %err,
            last_error = %last_error,
            "Giving up on save"
        );
        self.publish(|s| {
            s.is_saving = false;
            s.phase = SavePhase::Failed;
        });
        self.notifier.notify(Toast::exhausted()).await;
        self.notifier
            .settled(self.report(&attempt, false, Some(last_error)))
            .await;
    }

    fn abandon(&mut self, reason: &str) {
        if let Some(attempt) = self.machine.abandon() {
            debug!(coordinator = %self.id, attempt_id = %attempt.id, reason, "Save attempt abandoned");
        }
        self.publish(|s| {
            s.is_saving = false;
            s.retry_count = 0;
            s.phase = SavePhase::Idle;
        });
    }

    fn report(&self, attempt: &SaveAttempt<T>, stale: bool, error: Option<String>) -> SaveSettled {
        SaveSettled {
            coordinator_id: self.id.clone(),
            attempt_id: attempt.id.clone(),
            trigger: attempt.trigger,
            outcome: attempt.outcome,
            retries: attempt.retry_count,
            stale,
            error,
        }
    }

    /// Apply `update` to the shared state, notifying watchers only when
    /// something changed. Never writes after cancellation.
    fn publish(&self, update: impl FnOnce(&mut SaveState)) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.state.send_if_modified(|state| {
            let before = state.clone();
            update(state);
            *state != before
        });
    }
}

/// Wait for an optional timer; never resolves when there is none.
pub(crate) async fn elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

pub(crate) async fn join(
    task: &mut Option<JoinHandle<PersistOutcome>>,
) -> Result<PersistOutcome, JoinError> {
    match task {
        Some(task) => task.await,
        None => pending().await,
    }
}
