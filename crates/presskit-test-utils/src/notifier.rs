//! A notifier that keeps everything it receives.

use async_trait::async_trait;
use presskit_autosave::{Notifier, SaveSettled, Severity, Toast};
use std::sync::Mutex;

#[derive(Default)]
pub struct ToastCollector {
    toasts: Mutex<Vec<Toast>>,
    settled: Mutex<Vec<SaveSettled>>,
}

impl ToastCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn settled(&self) -> Vec<SaveSettled> {
        self.settled.lock().unwrap().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.toasts
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.severity == severity)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl Notifier for ToastCollector {
    async fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }

    async fn settled(&self, report: SaveSettled) {
        self.settled.lock().unwrap().push(report);
    }
}
