//! One JSON file per key.
//!
//! `["drafts", "tour-2026"]` is stored at `<root>/drafts/tour-2026.json`.

use crate::{validate_key, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &[&str]) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let mut path = self.root.clone();
        path.extend(key);
        path.set_extension("json");
        Ok(path)
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        let path = self.path_for(key)?;
        debug!(path = %path.display(), "Reading draft");

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        let path = self.path_for(key)?;
        debug!(path = %path.display(), "Writing draft");

        let content = serde_json::to_vec_pretty(value)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }

        // Readers only ever see a complete file
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, &content).await?;
        fs::rename(&staging, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        debug!(path = %path.display(), "Removing draft");

        match fs::remove_file(&path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(StorageError::Io(e)),
            _ => Ok(()),
        }
    }
}
