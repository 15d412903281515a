//! Tracing subscriber setup.
//!
//! Interactive commands log to a file so log lines never interleave with the
//! editor's own output. Verbose runs log to stderr instead.

use crate::error::{Error, ErrorKind, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
    }

    /// Filter directives enabling this level for every presskit crate and
    /// nothing else.
    pub fn directives(&self) -> String {
        ["presskit", "presskit_autosave", "presskit_storage", "presskit_util"]
            .map(|krate| format!("{krate}={}", self.as_str()))
            .join(",")
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    /// `presskit.log` in the logs directory, or nowhere if that cannot be
    /// resolved.
    #[default]
    DefaultFile,
}

#[derive(Debug, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub target: LogTarget,
    /// Add source file and line to each record.
    pub include_location: bool,
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
///
/// Returns the log file in use, if any. Fails if a subscriber is already
/// installed or the log file cannot be opened.
pub fn init(config: LogConfig) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directives()));

    let to_stderr = config.target == LogTarget::Stderr;
    let path = match config.target {
        LogTarget::Stderr => None,
        LogTarget::File(path) => Some(path),
        LogTarget::DefaultFile => default_log_path(),
    };
    let writer = match &path {
        Some(path) => BoxMakeWriter::new(Mutex::new(open_log(path)?)),
        None if to_stderr => BoxMakeWriter::new(std::io::stderr),
        None => BoxMakeWriter::new(std::io::sink),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(path.is_none())
        .with_target(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| Error::logging(e.to_string()))?;

    Ok(path)
}

fn open_log(path: &Path) -> Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            Error::with_source(
                ErrorKind::Io,
                format!("could not open log file {}", path.display()),
                e,
            )
        })
}

pub fn default_log_path() -> Option<PathBuf> {
    crate::path::logs_dir().map(|dir| dir.join("presskit.log"))
}
