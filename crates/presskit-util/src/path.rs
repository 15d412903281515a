//! Path utilities.

use std::path::{Path, PathBuf};

/// Name of the directory, under the data directory, that holds drafts.
pub const DRAFTS_DIR: &str = "drafts";

/// Get the presskit configuration directory.
///
/// On Unix, prefers `~/.config/presskit` when it exists, falling back to the
/// platform config directory.
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        if let Some(home) = dirs::home_dir() {
            let xdg_config = home.join(".config").join("presskit");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }
    }

    dirs::config_dir().map(|p| p.join("presskit"))
}

/// Get the presskit data directory (`~/.local/share/presskit` on Linux).
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("presskit"))
}

/// Directory drafts are stored in for a given data directory.
pub fn drafts_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(DRAFTS_DIR)
}

/// Get the presskit logs directory.
pub fn logs_dir() -> Option<PathBuf> {
    data_dir().map(|p| p.join("logs"))
}
