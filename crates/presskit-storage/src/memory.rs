//! Map-backed storage.
//!
//! Nothing survives the process. `set_read_only(true)` makes writes and
//! removals fail with [`StorageError::ReadOnly`].

use crate::{validate_key, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
pub struct MemoryStorage {
    values: RwLock<BTreeMap<String, String>>,
    read_only: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn values(&self) -> StorageResult<RwLockReadGuard<'_, BTreeMap<String, String>>> {
        self.values
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }

    /// Write access, refused while read-only.
    fn values_mut(&self) -> StorageResult<RwLockWriteGuard<'_, BTreeMap<String, String>>> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::ReadOnly);
        }
        self.values
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        validate_key(key)?;
        let values = self.values()?;
        let value = values
            .get(&key.join("/"))
            .map(|json| serde_json::from_str(json))
            .transpose()?;
        Ok(value)
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        validate_key(key)?;
        let json = serde_json::to_string(value)?;
        self.values_mut()?.insert(key.join("/"), json);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        validate_key(key)?;
        self.values_mut()?.remove(&key.join("/"));
        Ok(())
    }
}
