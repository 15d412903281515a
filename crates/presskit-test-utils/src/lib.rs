//! Testing utilities, fixtures, and doubles for presskit.
//!
//! - **Persist**: [`RecordingPersist`], a scriptable persist capability that
//!   records every call with its tokio timestamp
//! - **Notifier**: [`ToastCollector`], which keeps every toast and report
//! - **Fixtures**: sample drafts and temporary project directories
//! - **Assertions**: timing helpers for paused-clock tests
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use presskit_test_utils::{fixtures::Draft, RecordingPersist, ToastCollector};
//!
//! #[tokio::test(start_paused = true)]
//! async fn retries_then_saves() {
//!     let persist = Arc::new(RecordingPersist::new().then_fail(2));
//!     let toasts = Arc::new(ToastCollector::new());
//!     let mut autosave = DocumentAutoSave::builder(persist.clone())
//!         .notifier(toasts.clone())
//!         .spawn();
//!
//!     autosave.update(Draft::titled("A")).unwrap();
//!     autosave.update(Draft::titled("AB")).unwrap();
//!     tokio::time::sleep(Duration::from_secs(10)).await;
//!
//!     assert_eq!(persist.call_count(), 3);
//! }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod notifier;
pub mod persist;

pub use fixtures::{Draft, TestProject};
pub use notifier::ToastCollector;
pub use persist::{PersistCall, RecordingPersist, Step};
