//! Storage cell
//!
//! One key of one backend, a fallback value, and a cache kept consistent
//! with what the cell last wrote or observed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OnceCell};

use nexttab_storage::{Backend, BackendKind};

use crate::error::CellError;
use crate::hub::{NotificationHub, Subscription};
use crate::merge::deep_merge;
use crate::update::Update;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellOptions {
    /// Apply writes made by other contexts to the cache as they happen
    pub live_update: bool,
}

impl Default for CellOptions {
    fn default() -> Self {
        Self { live_update: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Availability {
    Persistent,
    /// Backend could not be opened; the cache is the only state
    CacheOnly,
}

struct CellInner<V> {
    key: String,
    fallback: V,
    backend: Arc<dyn Backend>,
    options: CellOptions,
    hub: Arc<NotificationHub<V>>,
    availability: OnceCell<Availability>,
    /// Held from reading the previous value until the cache is committed,
    /// by local writes and by the external change relay alike
    write_lock: Mutex<()>,
}

/// Reactive cache plus persistence for one key.
///
/// Clones share the same cache and subscribers.
pub struct StorageCell<V> {
    inner: Arc<CellInner<V>>,
}

impl<V> Clone for StorageCell<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> StorageCell<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(backend: Arc<dyn Backend>, key: impl Into<String>, fallback: V) -> Self {
        Self::with_options(backend, key, fallback, CellOptions::default())
    }

    pub fn with_options(
        backend: Arc<dyn Backend>,
        key: impl Into<String>,
        fallback: V,
        options: CellOptions,
    ) -> Self {
        Self {
            inner: Arc::new(CellInner {
                key: key.into(),
                fallback,
                backend,
                options,
                hub: NotificationHub::new(),
                availability: OnceCell::new(),
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.inner.backend.kind()
    }

    /// True once the backend has failed to open. Stays true for the life of
    /// this cell.
    pub fn is_degraded(&self) -> bool {
        self.inner.availability.get() == Some(&Availability::CacheOnly)
    }

    /// Populates the cache from the backend and notifies subscribers once.
    ///
    /// If a local write already populated the cache, the read result is
    /// discarded.
    pub async fn warm_up(&self) -> Result<()> {
        let value = self.get().await?;
        if self.inner.hub.commit_if_uninitialized(value) {
            tracing::debug!(
                key = %self.inner.key,
                backend = %self.inner.backend.kind(),
                "Warmed up storage cell"
            );
        }
        Ok(())
    }

    /// Current durable value, or the fallback if unset or unreadable.
    ///
    /// In cache-only mode returns the cache, or the fallback before any write.
    pub async fn get(&self) -> Result<V> {
        if self.availability().await == Availability::CacheOnly {
            return Ok(self.snapshot().unwrap_or_else(|| self.inner.fallback.clone()));
        }

        let stored = self.inner.backend.read(&self.inner.key).await?;
        Ok(decode_stored(&self.inner.key, &self.inner.fallback, stored))
    }

    /// The cache without awaiting. `None` until warm-up or the first write.
    pub fn snapshot(&self) -> Option<V> {
        self.inner.hub.snapshot()
    }

    pub async fn set(&self, value: V) -> Result<V> {
        self.apply(Update::Value(value)).await
    }

    pub async fn update<F>(&self, f: F) -> Result<V>
    where
        F: FnOnce(&V) -> V + Send + 'static,
    {
        self.apply(Update::with(f)).await
    }

    /// Persists the new value, then commits it to the cache and notifies.
    ///
    /// Writes to one cell run one at a time, so an updater always sees the
    /// value committed by the write before it: the cache if populated,
    /// otherwise a fresh read. A failed write leaves the cache untouched and
    /// returns the error.
    pub async fn apply(&self, update: Update<V>) -> Result<V> {
        let _guard = self.inner.write_lock.lock().await;
        let next = match update {
            Update::Value(value) => value,
            Update::With(f) => {
                let prev = self.previous().await?;
                f(&prev)
            }
        };
        self.commit_write(next).await
    }

    /// Deep-merges a partial JSON record into the current value.
    ///
    /// Fails without writing if the merged record no longer deserializes.
    pub async fn patch(&self, patch: &Value) -> Result<V> {
        let _guard = self.inner.write_lock.lock().await;
        let prev = serde_json::to_value(self.previous().await?)?;
        let merged = deep_merge(&prev, patch);
        let next: V = serde_json::from_value(merged).map_err(|e| CellError::InvalidPatch {
            key: self.inner.key.clone(),
            reason: e.to_string(),
        })?;
        self.commit_write(next).await
    }

    /// Clears the key and resets the cache to the fallback.
    pub async fn remove(&self) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;
        if self.availability().await == Availability::Persistent {
            self.inner.backend.delete(&self.inner.key).await?;
        }
        self.inner.hub.commit(self.inner.fallback.clone());
        Ok(())
    }

    /// Registers `listener` for every future cache change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        self.inner.hub.subscribe(listener)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.hub.listener_count()
    }

    async fn previous(&self) -> Result<V> {
        match self.snapshot() {
            Some(cached) => Ok(cached),
            None => self.get().await,
        }
    }

    async fn commit_write(&self, next: V) -> Result<V> {
        if self.availability().await == Availability::Persistent {
            let encoded = serde_json::to_vec(&next)?;
            self.inner.backend.write(&self.inner.key, encoded).await?;
        }
        self.inner.hub.commit(next.clone());
        Ok(next)
    }

    /// Opens the backend on first use and starts the external change relay.
    async fn availability(&self) -> Availability {
        *self
            .inner
            .availability
            .get_or_init(|| async {
                match self.inner.backend.open().await {
                    Ok(()) => {
                        if self.inner.options.live_update {
                            self.start_relay();
                        }
                        Availability::Persistent
                    }
                    Err(e) => {
                        tracing::warn!(
                            key = %self.inner.key,
                            backend = %self.inner.backend.kind(),
                            error = %e,
                            "Backend unavailable, cell running from cache only"
                        );
                        Availability::CacheOnly
                    }
                }
            })
            .await
    }

    /// Relays changes made by other contexts until the stream ends or every
    /// clone of this cell is dropped.
    fn start_relay(&self) {
        let mut stream = self.inner.backend.watch(&self.inner.key);
        let cell: Weak<CellInner<V>> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                let Some(inner) = cell.upgrade() else {
                    break;
                };
                StorageCell { inner }.apply_external(event.new_value).await;
            }
        });
    }

    /// Commits the durable value after another context changed the key.
    ///
    /// A queued event may predate a local write that has since finished, so
    /// the backend is read again under the write lock. The event payload is
    /// used only when that read fails.
    async fn apply_external(&self, payload: Option<Vec<u8>>) {
        let _guard = self.inner.write_lock.lock().await;
        let stored = match self.inner.backend.read(&self.inner.key).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(
                    key = %self.inner.key,
                    error = %e,
                    "Re-read after external change failed, using event value"
                );
                payload
            }
        };
        tracing::debug!(key = %self.inner.key, "Relaying external change");
        self.inner
            .hub
            .commit(decode_stored(&self.inner.key, &self.inner.fallback, stored));
    }
}

/// Stored bytes that do not decode are treated as absent.
fn decode_stored<V>(key: &str, fallback: &V, stored: Option<Vec<u8>>) -> V
where
    V: Clone + DeserializeOwned,
{
    let Some(bytes) = stored else {
        return fallback.clone();
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Malformed stored value, using fallback");
            fallback.clone()
        }
    }
}
