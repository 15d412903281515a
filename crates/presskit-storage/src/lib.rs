//! Where press-kit drafts end up.
//!
//! Two backends implement [`Storage`]: [`JsonStorage`] keeps one JSON file
//! per key under a data directory, and [`MemoryStorage`] keeps values in a map
//! and can be switched read-only to stand in for an unreachable backend.

pub mod error;
pub mod json;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use json::JsonStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Key-value store addressed by path segments such as `["drafts", "tour-2026"]`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>>;

    async fn write<T: Serialize + Send + Sync>(&self, key: &[&str], value: &T)
        -> StorageResult<()>;

    /// Removing a missing key succeeds.
    async fn remove(&self, key: &[&str]) -> StorageResult<()>;
}

/// Reject keys that could escape the store: empty keys, empty segments,
/// path separators and `.`/`..`.
pub(crate) fn validate_key(key: &[&str]) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_key("no segments"));
    }
    fn bad(segment: &str) -> bool {
        segment.is_empty() || matches!(segment, "." | "..") || segment.contains(['/', '\\'])
    }
    match key.iter().find(|segment| bad(segment)) {
        Some(segment) => Err(StorageError::invalid_key(format!("segment {segment:?}"))),
        None => Ok(()),
    }
}
