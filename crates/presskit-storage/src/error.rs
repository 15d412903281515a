//! Draft store errors.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("draft store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("draft is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A key that cannot be mapped onto the store.
    #[error("invalid draft key: {0}")]
    InvalidKey(String),

    /// The backend refuses writes. Used to simulate an unreachable backend.
    #[error("Storage is read-only")]
    ReadOnly,

    #[error("in-memory store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StorageError {
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey(message.into())
    }
}
