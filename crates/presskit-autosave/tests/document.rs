//! Document coordinator behavior under a paused tokio clock.

use chrono::{DateTime, TimeZone, Utc};
use presskit_autosave::{
    AttemptOutcome, AutoSaveConfig, Bus, Clock, DocumentAutoSave, Persist,
    RetrySnapshot, SavePhase, Severity, StoragePersist, Toast, TriggerKind,
};
use presskit_storage::{JsonStorage, Storage};
use presskit_test_utils::assertions::{assert_elapsed_at_least, run_for, settle};
use presskit_test_utils::{Draft, RecordingPersist, ToastCollector};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct Harness {
    persist: Arc<RecordingPersist<Draft>>,
    toasts: Arc<ToastCollector>,
    autosave: DocumentAutoSave<Draft>,
}

fn harness(persist: RecordingPersist<Draft>, config: AutoSaveConfig) -> Harness {
    let persist = Arc::new(persist);
    let toasts = Arc::new(ToastCollector::new());
    let dyn_persist: Arc<dyn Persist<Draft>> = persist.clone();
    let autosave = DocumentAutoSave::builder(dyn_persist)
        .config(config)
        .notifier(toasts.clone())
        .spawn();
    Harness {
        persist,
        toasts,
        autosave,
    }
}

fn default_harness(persist: RecordingPersist<Draft>) -> Harness {
    harness(persist, AutoSaveConfig::default())
}

#[tokio::test(start_paused = true)]
async fn first_snapshot_is_baseline() {
    let mut h = default_harness(RecordingPersist::new());

    assert!(!h.autosave.update(Draft::titled("A")).unwrap());
    assert!(!h.autosave.update(Draft::titled("A")).unwrap());
    assert!(!h.autosave.state().has_unsaved_changes);

    run_for(Duration::from_secs(5)).await;
    assert_eq!(h.persist.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dirty_flag_is_set_synchronously() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("A")).unwrap();

    // No await between the change and the check
    assert!(h.autosave.update(Draft::titled("AB")).unwrap());
    assert!(h.autosave.state().has_unsaved_changes);
    assert!(!h.autosave.state().is_saving);
}

#[tokio::test(start_paused = true)]
async fn rebuilt_equal_snapshot_is_not_a_change() {
    let mut h = default_harness(RecordingPersist::new());
    let draft = Draft::titled("Night Swim").with_link("bandcamp", "https://ns.bandcamp.com");

    h.autosave.update(draft.clone()).unwrap();
    let rebuilt = Draft::titled("Night Swim").with_link("bandcamp", "https://ns.bandcamp.com");
    assert!(!h.autosave.update(rebuilt).unwrap());
    assert!(!h.autosave.state().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn quick_edits_are_coalesced_into_one_save() {
    let mut h = default_harness(RecordingPersist::new());

    h.autosave.update(Draft::titled("A")).unwrap();
    run_for(Duration::from_millis(50)).await;
    h.autosave.update(Draft::titled("AB")).unwrap();
    let last_change = Instant::now();

    run_for(Duration::from_millis(499)).await;
    assert_eq!(h.persist.call_count(), 0, "saved before the debounce elapsed");

    run_for(Duration::from_millis(500)).await;
    let calls = h.persist.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].value, Draft::titled("AB"));
    assert_elapsed_at_least(last_change, calls[0].at, Duration::from_millis(500));

    let state = h.autosave.state();
    assert!(!state.has_unsaved_changes);
    assert!(!state.is_saving);
    assert!(state.last_saved.is_some());
    assert_eq!(state.phase, SavePhase::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn each_change_restarts_the_debounce() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("")).unwrap();

    let mut last_change = Instant::now();
    for title in ["N", "Ni", "Nig", "Nigh", "Night"] {
        h.autosave.update(Draft::titled(title)).unwrap();
        last_change = Instant::now();
        run_for(Duration::from_millis(300)).await;
    }
    assert_eq!(h.persist.call_count(), 0);

    run_for(Duration::from_secs(2)).await;
    let calls = h.persist.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].value, Draft::titled("Night"));
    assert_elapsed_at_least(last_change, calls[0].at, Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn single_persist_in_flight() {
    let mut h = default_harness(RecordingPersist::new().with_latency(Duration::from_secs(3)));
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();

    run_for(Duration::from_millis(600)).await;
    assert_eq!(h.persist.call_count(), 1);
    assert!(h.autosave.state().is_saving);

    // Edits and manual saves while the first call is running
    h.autosave.update(Draft::titled("ABC")).unwrap();
    h.autosave.trigger_save().unwrap();
    run_for(Duration::from_millis(600)).await;
    h.autosave.trigger_save().unwrap();
    assert_eq!(h.persist.call_count(), 1);

    run_for(Duration::from_secs(10)).await;
    assert_eq!(h.persist.peak_concurrency(), 1);
    assert_eq!(
        h.persist.values(),
        vec![Draft::titled("AB"), Draft::titled("ABC")]
    );
    assert!(!h.autosave.state().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn stale_success_keeps_document_dirty() {
    let mut h = default_harness(RecordingPersist::new().with_latency(Duration::from_secs(1)));
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();

    run_for(Duration::from_millis(600)).await;
    h.autosave.update(Draft::titled("ABC")).unwrap();

    // First call finishes at 1.5s with content that is already outdated
    run_for(Duration::from_millis(1000)).await;
    let state = h.autosave.state();
    assert!(state.has_unsaved_changes);
    assert!(state.last_saved.is_some());

    run_for(Duration::from_secs(3)).await;
    assert_eq!(h.persist.call_count(), 2);
    assert!(!h.autosave.state().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn retries_with_backoff_then_succeeds() {
    let mut h = default_harness(RecordingPersist::new().then_fail(2));
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();

    run_for(Duration::from_millis(600)).await;
    let state = h.autosave.state();
    assert_eq!(h.persist.call_count(), 1);
    assert!(state.is_saving);
    assert_eq!(state.retry_count, 1);
    assert_eq!(state.phase, SavePhase::Retrying { retry: 1, max: 3 });

    run_for(Duration::from_secs(30)).await;
    assert_eq!(h.persist.call_count(), 3);

    let gaps = h.persist.gaps();
    assert!(gaps[0] >= Duration::from_secs(2), "first retry after {:?}", gaps[0]);
    assert!(gaps[1] >= Duration::from_secs(4), "second retry after {:?}", gaps[1]);

    let state = h.autosave.state();
    assert!(!state.has_unsaved_changes);
    assert!(!state.is_saving);
    assert_eq!(state.retry_count, 0);
    assert!(state.last_saved.is_some());

    assert_eq!(h.toasts.count(Severity::Warning), 2);
    assert_eq!(h.toasts.count(Severity::Error), 0);
    // Automatic saves do not announce success
    assert_eq!(h.toasts.count(Severity::Success), 0);

    let settled = h.toasts.settled();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].outcome, AttemptOutcome::Success);
    assert_eq!(settled[0].retries, 2);
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_three_retries() {
    let mut h = default_harness(RecordingPersist::failing());
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();

    run_for(Duration::from_secs(60)).await;
    assert_eq!(h.persist.call_count(), 4);
    assert_eq!(
        h.persist.gaps(),
        vec![
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8)
        ]
    );

    let state = h.autosave.state();
    assert!(!state.is_saving);
    assert!(state.has_unsaved_changes);
    assert_eq!(state.phase, SavePhase::Failed);
    assert_eq!(state.last_saved, None);

    let toasts = h.toasts.toasts();
    assert_eq!(toasts.len(), 4);
    assert_eq!(toasts[0], Toast::retrying(1, 3));
    assert_eq!(toasts[2], Toast::retrying(3, 3));
    assert_eq!(toasts[3], Toast::exhausted());

    let settled = h.toasts.settled();
    assert_eq!(settled[0].outcome, AttemptOutcome::Failed);
    assert_eq!(settled[0].retries, 3);
    assert_eq!(settled[0].error.as_deref(), Some("scripted failure"));

    run_for(Duration::from_secs(60)).await;
    assert_eq!(h.persist.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn next_edit_after_giving_up_starts_fresh() {
    let mut h = harness(
        RecordingPersist::new().then_fail(4),
        AutoSaveConfig::default(),
    );
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_secs(60)).await;
    assert_eq!(h.autosave.state().phase, SavePhase::Failed);

    h.autosave.update(Draft::titled("ABC")).unwrap();
    run_for(Duration::from_secs(1)).await;
    assert_eq!(h.persist.call_count(), 5);
    assert!(!h.autosave.state().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn manual_save_when_clean_is_a_noop() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("A")).unwrap();

    h.autosave.trigger_save().unwrap();
    run_for(Duration::from_secs(5)).await;

    assert_eq!(h.persist.call_count(), 0);
    assert!(h.toasts.is_empty());
    assert_eq!(h.autosave.state().phase, SavePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn manual_save_bypasses_debounce() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    let changed = Instant::now();

    h.autosave.trigger_save().unwrap();
    settle().await;

    let calls = h.persist.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].at, changed);

    run_for(Duration::from_secs(2)).await;
    assert_eq!(h.persist.call_count(), 1, "debounce fired after manual save");
    assert_eq!(h.toasts.toasts(), vec![Toast::saved()]);
    assert_eq!(h.toasts.settled()[0].trigger, TriggerKind::Manual);
}

#[tokio::test(start_paused = true)]
async fn manual_save_after_dirty_override() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("A")).unwrap();

    h.autosave.set_unsaved_changes(true);
    assert!(h.autosave.state().has_unsaved_changes);
    h.autosave.trigger_save().unwrap();
    run_for(Duration::from_millis(10)).await;

    assert_eq!(h.persist.values(), vec![Draft::titled("A")]);
    assert!(!h.autosave.state().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn clearing_dirty_flag_skips_pending_auto_save() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();

    h.autosave.set_unsaved_changes(false);
    run_for(Duration::from_secs(2)).await;
    assert_eq!(h.persist.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn retry_uses_original_snapshot_by_default() {
    let mut h = default_harness(RecordingPersist::new().then_fail(1));
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_millis(600)).await;

    h.autosave.update(Draft::titled("ABC")).unwrap();
    run_for(Duration::from_secs(10)).await;

    assert_eq!(
        h.persist.values(),
        vec![
            Draft::titled("AB"),
            Draft::titled("AB"),
            Draft::titled("ABC")
        ]
    );
    assert!(!h.autosave.state().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn retry_can_use_latest_snapshot() {
    let config = AutoSaveConfig {
        retry_snapshot: RetrySnapshot::Latest,
        ..AutoSaveConfig::default()
    };
    let mut h = harness(RecordingPersist::new().then_fail(1), config);
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_millis(600)).await;

    h.autosave.update(Draft::titled("ABC")).unwrap();
    run_for(Duration::from_secs(10)).await;

    assert_eq!(
        h.persist.values(),
        vec![Draft::titled("AB"), Draft::titled("ABC")]
    );
    assert!(!h.autosave.state().has_unsaved_changes);
}

#[tokio::test(start_paused = true)]
async fn disabled_coordinator_does_not_auto_save() {
    let config = AutoSaveConfig {
        enabled: false,
        ..AutoSaveConfig::default()
    };
    let mut h = harness(RecordingPersist::new(), config);
    assert!(!h.autosave.is_enabled());

    h.autosave.update(Draft::titled("A")).unwrap();
    assert!(!h.autosave.update(Draft::titled("AB")).unwrap());
    assert!(!h.autosave.state().has_unsaved_changes);

    run_for(Duration::from_secs(5)).await;
    assert_eq!(h.persist.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn disabling_cancels_pending_debounce() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_millis(200)).await;

    h.autosave.set_enabled(false).unwrap();
    run_for(Duration::from_secs(5)).await;
    assert_eq!(h.persist.call_count(), 0);
    assert!(h.autosave.state().has_unsaved_changes);

    // Still saveable by hand, with the newest content
    h.autosave.update(Draft::titled("ABC")).unwrap();
    h.autosave.trigger_save().unwrap();
    run_for(Duration::from_millis(10)).await;
    assert_eq!(h.persist.values(), vec![Draft::titled("ABC")]);
}

#[tokio::test(start_paused = true)]
async fn reenabling_detects_edits_made_while_disabled() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("A")).unwrap();

    h.autosave.set_enabled(false).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    h.autosave.set_enabled(true).unwrap();

    assert!(h.autosave.update(Draft::titled("AB")).unwrap());
    run_for(Duration::from_secs(1)).await;
    assert_eq!(h.persist.values(), vec![Draft::titled("AB")]);
}

#[tokio::test(start_paused = true)]
async fn disabling_during_backoff_abandons_retry() {
    let mut h = default_harness(RecordingPersist::failing());
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_secs(1)).await;
    assert!(h.autosave.state().is_saving);

    h.autosave.set_enabled(false).unwrap();
    run_for(Duration::from_secs(30)).await;

    assert_eq!(h.persist.call_count(), 1);
    let state = h.autosave.state();
    assert!(!state.is_saving);
    assert!(state.has_unsaved_changes);
    assert_eq!(state.phase, SavePhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn manual_save_failing_while_disabled_is_reported() {
    let config = AutoSaveConfig {
        enabled: false,
        ..AutoSaveConfig::default()
    };
    let mut h = harness(RecordingPersist::failing(), config);
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.set_unsaved_changes(true);
    h.autosave.trigger_save().unwrap();
    run_for(Duration::from_secs(60)).await;

    assert_eq!(h.persist.call_count(), 1);
    let state = h.autosave.state();
    assert!(!state.is_saving);
    assert!(state.has_unsaved_changes);
    assert_eq!(state.phase, SavePhase::Failed);

    assert_eq!(h.toasts.toasts(), vec![Toast::exhausted()]);
    let settled = h.toasts.settled();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].trigger, TriggerKind::Manual);
    assert_eq!(settled[0].outcome, AttemptOutcome::Failed);
    assert_eq!(settled[0].retries, 0);
}

#[tokio::test(start_paused = true)]
async fn disabling_mid_save_makes_a_failure_final() {
    let mut h = default_harness(
        RecordingPersist::failing().with_latency(Duration::from_secs(1)),
    );
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_millis(600)).await;
    assert!(h.autosave.state().is_saving);

    h.autosave.set_enabled(false).unwrap();
    run_for(Duration::from_secs(30)).await;

    assert_eq!(h.persist.call_count(), 1);
    let state = h.autosave.state();
    assert!(!state.is_saving);
    assert!(state.has_unsaved_changes);
    assert_eq!(state.phase, SavePhase::Failed);
    assert_eq!(h.toasts.count(Severity::Error), 1);
    assert_eq!(h.toasts.settled()[0].trigger, TriggerKind::Auto);
}

#[tokio::test(start_paused = true)]
async fn teardown_during_debounce() {
    let mut h = default_harness(RecordingPersist::new());
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_millis(200)).await;

    let rx = h.autosave.subscribe();
    let before = rx.borrow().clone();
    drop(h.autosave);

    run_for(Duration::from_secs(10)).await;
    assert_eq!(h.persist.call_count(), 0);
    assert_eq!(*rx.borrow(), before);
}

#[tokio::test(start_paused = true)]
async fn teardown_during_retry_backoff() {
    let mut h = default_harness(RecordingPersist::failing());
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_secs(1)).await;
    assert_eq!(h.persist.call_count(), 1);

    let rx = h.autosave.subscribe();
    let before = rx.borrow().clone();
    h.autosave.shutdown().await;

    run_for(Duration::from_secs(60)).await;
    assert_eq!(h.persist.call_count(), 1);
    assert_eq!(*rx.borrow(), before);
    assert_eq!(h.toasts.toasts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_detaches_in_flight_persist() {
    let mut h = default_harness(RecordingPersist::new().with_latency(Duration::from_secs(2)));
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_millis(600)).await;

    let rx = h.autosave.subscribe();
    let before = rx.borrow().clone();
    assert!(before.is_saving);
    h.autosave.shutdown().await;

    run_for(Duration::from_secs(5)).await;
    // The call finished, but nobody applied its result
    assert_eq!(h.persist.completed(), 1);
    assert_eq!(*rx.borrow(), before);
    assert!(h.toasts.settled().is_empty());
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[tokio::test(start_paused = true)]
async fn last_saved_comes_from_the_clock() {
    let at = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
    let persist: Arc<dyn Persist<Draft>> = Arc::new(RecordingPersist::<Draft>::new());
    let mut autosave = DocumentAutoSave::builder(persist)
        .clock(Arc::new(FixedClock(at)))
        .spawn();

    autosave.update(Draft::titled("A")).unwrap();
    autosave.update(Draft::titled("AB")).unwrap();
    run_for(Duration::from_secs(1)).await;

    assert_eq!(autosave.state().last_saved, Some(at));
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_saving_transitions() {
    let mut h = default_harness(RecordingPersist::new().with_latency(Duration::from_millis(100)));
    let mut rx = h.autosave.subscribe();
    h.autosave.update(Draft::titled("A")).unwrap();
    h.autosave.update(Draft::titled("AB")).unwrap();

    let mut saw_saving = false;
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        tokio::select! {
            changed = rx.changed() => {
                changed.unwrap();
                let state = rx.borrow_and_update().clone();
                saw_saving |= state.is_saving;
                if state.phase == SavePhase::Succeeded {
                    break;
                }
            }
            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    assert!(saw_saving);
    assert_eq!(h.autosave.state().phase, SavePhase::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn notifications_reach_the_bus() {
    let bus = Bus::new();
    let mut toasts = bus.subscribe::<Toast>();
    let persist: Arc<dyn Persist<Draft>> = Arc::new(RecordingPersist::<Draft>::new());
    let mut autosave = DocumentAutoSave::builder(persist)
        .notifier(Arc::new(bus.clone()))
        .spawn();

    autosave.update(Draft::titled("A")).unwrap();
    autosave.update(Draft::titled("AB")).unwrap();
    autosave.trigger_save().unwrap();

    let toast = tokio::time::timeout(Duration::from_secs(1), toasts.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(toast, Toast::saved());
}

#[tokio::test]
async fn saves_into_json_storage() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(JsonStorage::new(dir.path()));
    let persist: Arc<dyn Persist<Draft>> =
        Arc::new(StoragePersist::new(Arc::clone(&storage), &["drafts", "night-swim"]));
    let config = AutoSaveConfig {
        delay_ms: 10,
        ..AutoSaveConfig::default()
    };
    let mut autosave = DocumentAutoSave::new(persist, config);
    let mut rx = autosave.subscribe();

    autosave.update(Draft::titled("Night")).unwrap();
    autosave
        .update(Draft::titled("Night Swim").with_bio("Dream pop"))
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if rx.borrow_and_update().last_saved.is_some() {
                break;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .unwrap();

    let stored: Option<Draft> = storage.read(&["drafts", "night-swim"]).await.unwrap();
    assert_eq!(stored, Some(Draft::titled("Night Swim").with_bio("Dream pop")));
    autosave.shutdown().await;
}
