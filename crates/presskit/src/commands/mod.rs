//! Command handlers for the presskit CLI.

pub mod config;
pub mod edit;
pub mod field;
pub mod logging;
pub mod output;
pub mod show;

pub use config::*;
pub use edit::*;
pub use field::*;
pub use logging::*;
pub use show::*;

use presskit_autosave::{AutoSaveConfig, Config};
use presskit_storage::JsonStorage;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs after startup.
pub struct Context {
    pub data_dir: PathBuf,
    pub autosave: AutoSaveConfig,
    pub config: Config,
    pub sources: Vec<PathBuf>,
}

impl Context {
    pub fn storage(&self) -> Arc<JsonStorage> {
        Arc::new(JsonStorage::new(&self.data_dir))
    }
}

/// Storage key of a draft.
pub fn draft_key(name: &str) -> [&str; 2] {
    [presskit_util::path::DRAFTS_DIR, name]
}
