//! Local area backend
//!
//! Device-only storage for large values such as wallpaper images. Never
//! synced, never quota-checked. The database is opened on first use; if that
//! fails the store stays unavailable for the rest of the process.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::backend::{Backend, BackendKind, ChangeStream};
use crate::database::Database;
use crate::error::StorageError;
use crate::notifier::{ChangeNotifier, ContextId};
use crate::Result;

#[derive(Debug, Clone)]
enum LocalSource {
    Path(PathBuf),
    InMemory,
    /// Restricted context with no local database at all
    Disabled(String),
}

struct LocalInner {
    source: LocalSource,
    store: String,
    db: OnceCell<std::result::Result<Database, String>>,
    notifier: ChangeNotifier,
}

#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<LocalInner>,
}

impl LocalStore {
    pub fn at_path(path: impl Into<PathBuf>, store: impl Into<String>) -> Self {
        Self::with_source(LocalSource::Path(path.into()), store.into())
    }

    pub fn in_memory(store: impl Into<String>) -> Self {
        Self::with_source(LocalSource::InMemory, store.into())
    }

    /// A store that can never open, for contexts without local storage.
    pub fn disabled(store: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with_source(LocalSource::Disabled(reason.into()), store.into())
    }

    fn with_source(source: LocalSource, store: String) -> Self {
        Self {
            inner: Arc::new(LocalInner {
                source,
                store,
                db: OnceCell::new(),
                notifier: ChangeNotifier::new(),
            }),
        }
    }

    pub fn context(&self) -> LocalBackend {
        LocalBackend {
            store: self.clone(),
            context: self.inner.notifier.next_context(),
        }
    }

    /// Opens the database on first call and caches the outcome.
    async fn database(&self) -> Result<Database> {
        let opened = self
            .inner
            .db
            .get_or_init(|| async { open_source(&self.inner.source, &self.inner.store).await })
            .await;

        match opened {
            Ok(db) => Ok(db.clone()),
            Err(reason) => Err(StorageError::Unavailable(reason.clone())),
        }
    }
}

async fn open_source(source: &LocalSource, store: &str) -> std::result::Result<Database, String> {
    let result = match source {
        LocalSource::InMemory => Database::open_in_memory().map_err(|e| e.to_string()),
        LocalSource::Disabled(reason) => Err(reason.clone()),
        LocalSource::Path(path) => {
            let path = path.clone();
            tokio::task::spawn_blocking(move || -> Result<Database> {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Database::open(&path)
            })
            .await
            .map_err(|e| e.to_string())
            .and_then(|opened| opened.map_err(|e| e.to_string()))
        }
    };

    match &result {
        Ok(_) => tracing::info!(store = %store, "Opened local store"),
        Err(reason) => tracing::warn!(
            store = %store,
            reason = %reason,
            "Local store unavailable, persistence disabled"
        ),
    }

    result
}

pub struct LocalBackend {
    store: LocalStore,
    context: ContextId,
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn store_name(&self) -> &str {
        &self.store.inner.store
    }

    async fn open(&self) -> Result<()> {
        self.store.database().await.map(|_| ())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let db = self.store.database().await?;
        db.get_local_entry(&self.store.inner.store, key)
    }

    async fn write(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let db = self.store.database().await?;
        db.put_local_entry(&self.store.inner.store, key, &value)?;

        tracing::debug!(
            store = %self.store.inner.store,
            key = %key,
            bytes = value.len(),
            "Wrote local entry"
        );

        self.store
            .inner
            .notifier
            .publish(self.context, key, Some(&value));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let db = self.store.database().await?;
        db.delete_local_entry(&self.store.inner.store, key)?;
        self.store.inner.notifier.publish(self.context, key, None);
        Ok(())
    }

    fn watch(&self, key: &str) -> ChangeStream {
        self.store.inner.notifier.watch(self.context, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_opens_lazily_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("local.db");
        let store = LocalStore::at_path(&path, "wallpaper");
        let backend = store.context();

        assert!(!path.exists());
        backend.write("image", vec![1, 2, 3]).await.unwrap();
        assert!(path.exists());
        assert_eq!(backend.read("image").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_disabled_store_is_unavailable() {
        let backend = LocalStore::disabled("wallpaper", "no local storage").context();

        let err = backend.open().await.unwrap_err();
        assert!(err.is_unavailable());
        let err = backend.read("image").await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_unopenable_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let store = LocalStore::at_path(blocker.join("local.db"), "wallpaper");

        let err = store.context().open().await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_contexts_share_database_and_events() {
        let store = LocalStore::in_memory("wallpaper");
        let writer = store.context();
        let reader = store.context();
        let mut events = reader.watch("image");

        writer.write("image", vec![9]).await.unwrap();

        assert_eq!(reader.read("image").await.unwrap(), Some(vec![9]));
        assert_eq!(events.try_recv().unwrap().new_value, Some(vec![9]));
    }
}
