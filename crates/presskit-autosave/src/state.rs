//! Observable coordinator state.

use crate::machine::SavePhase;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// State exposed by [`crate::DocumentAutoSave`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveState {
    pub has_unsaved_changes: bool,
    /// True from the start of an attempt until it succeeds or gives up,
    /// including the waits between retries.
    pub is_saving: bool,
    pub last_saved: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub phase: SavePhase,
}

impl SaveState {
    /// Short human-readable status, as shown next to a save button.
    pub fn status_line(&self) -> String {
        match self.phase {
            SavePhase::Retrying { retry, max } => format!("Retrying ({retry}/{max})"),
            _ if self.is_saving => "Saving...".to_string(),
            SavePhase::Failed if self.has_unsaved_changes => "Save failed".to_string(),
            _ if self.has_unsaved_changes => "Unsaved changes".to_string(),
            _ => match self.last_saved {
                Some(at) => format!("Saved at {}", at.format("%H:%M:%S")),
                None => "No changes".to_string(),
            },
        }
    }
}

/// State exposed by [`crate::FieldAutoSave`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldState {
    pub is_saving: bool,
    pub show_success: bool,
}
