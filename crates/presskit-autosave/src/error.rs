//! Error types for the auto-save engine.

use thiserror::Error;

/// A failure reported by a persist capability.
///
/// Every persist failure is treated the same way by the document
/// coordinator: it is transient until the retry budget runs out.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PersistError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it as the source.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<presskit_storage::StorageError> for PersistError {
    fn from(err: presskit_storage::StorageError) -> Self {
        Self::with_source(err.to_string(), err)
    }
}

/// Auto-save errors.
#[derive(Debug, Error)]
pub enum AutoSaveError {
    /// A single persist call failed. Recovered internally by retrying.
    #[error("persist failed: {0}")]
    Persist(#[from] PersistError),

    /// A persist failure that used up every retry.
    #[error("save failed after {retries} retries")]
    RetriesExhausted {
        retries: u32,
        #[source]
        last: PersistError,
    },

    /// The snapshot could not be serialized for change detection.
    #[error("snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The coordinator task has stopped.
    #[error("auto-save coordinator has shut down")]
    Closed,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON/JSONC syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// A value is out of range.
    #[error("config validation failed: {message}")]
    Validation { message: String },

    /// Environment variable not found during substitution.
    #[error("environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    /// An override variable held an unparseable value.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },

    /// IO error while reading a config file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for auto-save operations.
pub type AutoSaveResult<T> = Result<T, AutoSaveError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
