//! Logging initialization.
//!
//! Logs go to a file so they do not interleave with the editor output.
//! `--verbose` sends them to stderr at debug level instead.

use presskit_util::log::{LogConfig, LogLevel, LogTarget};
use std::path::PathBuf;

/// Initialize logging. Returns the log file path when logging to a file.
pub fn init_logging(verbose: bool, configured: Option<&str>) -> Option<PathBuf> {
    let level = if verbose {
        LogLevel::Debug
    } else {
        configured.and_then(LogLevel::parse).unwrap_or_default()
    };

    let config = LogConfig {
        level,
        target: if verbose {
            LogTarget::Stderr
        } else {
            LogTarget::DefaultFile
        },
        include_location: verbose,
    };

    match presskit_util::log::init(config) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Warning: Could not initialize logging: {e}");
            None
        }
    }
}
