//! The persist capability.
//!
//! Coordinators only know that saving a value is an async operation that
//! either succeeds or fails. Closures, storage backends and test doubles all
//! plug in through [`Persist`].

use crate::error::PersistError;
use async_trait::async_trait;
use presskit_storage::Storage;
use serde::Serialize;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Saves a value somewhere.
#[async_trait]
pub trait Persist<T: Send + 'static>: Send + Sync {
    async fn persist(&self, value: T) -> Result<(), PersistError>;
}

/// Adapter returned by [`persist_fn`].
pub struct PersistFn<F, T> {
    f: F,
    _value: PhantomData<fn(T)>,
}

/// Turn an async closure into a [`Persist`] implementation.
///
/// ```ignore
/// let persist = persist_fn(|bio: String| async move {
///     client.update_bio(&bio).await.map_err(|e| PersistError::with_source("update bio", e))
/// });
/// ```
pub fn persist_fn<T, F, Fut>(f: F) -> PersistFn<F, T>
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), PersistError>> + Send,
{
    PersistFn {
        f,
        _value: PhantomData,
    }
}

#[async_trait]
impl<T, F, Fut> Persist<T> for PersistFn<F, T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), PersistError>> + Send,
{
    async fn persist(&self, value: T) -> Result<(), PersistError> {
        (self.f)(value).await
    }
}

/// Writes each value to a fixed storage key.
pub struct StoragePersist<S> {
    storage: Arc<S>,
    key: Vec<String>,
}

impl<S: Storage> StoragePersist<S> {
    pub fn new<K: AsRef<str>>(storage: Arc<S>, key: &[K]) -> Self {
        Self {
            storage,
            key: key.iter().map(|k| k.as_ref().to_string()).collect(),
        }
    }

    pub fn key(&self) -> &[String] {
        &self.key
    }
}

#[async_trait]
impl<T, S> Persist<T> for StoragePersist<S>
where
    T: Serialize + Send + Sync + 'static,
    S: Storage + 'static,
{
    async fn persist(&self, value: T) -> Result<(), PersistError> {
        let key: Vec<&str> = self.key.iter().map(String::as_str).collect();
        self.storage.write(&key, &value).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presskit_storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_persist_fn() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let persist = persist_fn(move |value: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if value.is_empty() {
                    Err(PersistError::new("empty"))
                } else {
                    Ok(())
                }
            }
        });

        assert!(persist.persist("bio".to_string()).await.is_ok());
        assert!(persist.persist(String::new()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_storage_persist_writes_key() {
        let storage = Arc::new(MemoryStorage::new());
        let persist = StoragePersist::new(Arc::clone(&storage), &["drafts", "night-swim"]);
        assert_eq!(persist.key(), ["drafts", "night-swim"]);

        persist.persist("hello".to_string()).await.unwrap();

        let stored: Option<String> = storage.read(&["drafts", "night-swim"]).await.unwrap();
        assert_eq!(stored.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_storage_persist_surfaces_failure() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_read_only(true);
        let persist = StoragePersist::new(Arc::clone(&storage), &["drafts", "a"]);

        let err = Persist::<u32>::persist(&persist, 7).await.unwrap_err();
        assert_eq!(err.message(), "Storage is read-only");
    }

    #[tokio::test]
    async fn test_trait_object() {
        let persist: Arc<dyn Persist<u32>> = Arc::new(persist_fn(|_: u32| async { Ok(()) }));
        assert!(persist.persist(1).await.is_ok());
    }
}
