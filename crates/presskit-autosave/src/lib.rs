//! Auto-save coordination for press-kit editing.
//!
//! Two coordinators share one save state machine:
//! - [`DocumentAutoSave`] watches a snapshot, debounces changes into a single
//!   persist call and retries failures with exponential backoff (2s, 4s, 8s).
//! - [`FieldAutoSave`] persists a single value when the commit key is pressed,
//!   with an optional transient success indicator and no retries.
//!
//! Both are polymorphic over the [`Persist`] capability and report through a
//! [`Notifier`]. Each coordinator runs as its own tokio task; dropping the
//! handle cancels pending timers and detaches any in-flight persist.
//!
//! # Example
//!
//! ```rust,ignore
//! use presskit_autosave::{persist_fn, AutoSaveConfig, DocumentAutoSave};
//!
//! let persist = Arc::new(persist_fn(|draft: Draft| async move { api.save(draft).await }));
//! let mut autosave = DocumentAutoSave::builder(persist)
//!     .config(AutoSaveConfig::default())
//!     .spawn();
//!
//! autosave.update(draft.clone())?;   // marks dirty, (re)starts the 500ms debounce
//! autosave.trigger_save()?;          // "Save now" button
//! let state = autosave.state();      // has_unsaved_changes / is_saving / last_saved
//! ```

pub mod bus;
pub mod clock;
pub mod config;
pub mod document;
pub mod error;
pub mod field;
pub mod machine;
pub mod notify;
pub mod persist;
pub mod retry;
pub mod snapshot;
pub mod state;

pub use bus::{Bus, BusEvent, Event};
pub use clock::{Clock, SystemClock};
pub use config::{AutoSaveConfig, AutoSaveSection, Config};
pub use document::{DocumentAutoSave, DocumentAutoSaveBuilder};
pub use error::{AutoSaveError, AutoSaveResult, ConfigError, ConfigResult, PersistError};
pub use field::{FieldAutoSave, FieldAutoSaveBuilder, Key, KeyOutcome, KeyPress};
pub use machine::{AttemptOutcome, Failure, SaveAttempt, SaveMachine, SavePhase, TriggerKind};
pub use notify::{LogNotifier, Notifier, NullNotifier, SaveSettled, Severity, Toast};
pub use persist::{persist_fn, Persist, PersistFn, StoragePersist};
pub use retry::{calculate_delay, RetryPolicy, RetrySnapshot};
pub use snapshot::{Captured, ChangeDetector, Fingerprint, Observation, Snapshot};
pub use state::{FieldState, SaveState};
