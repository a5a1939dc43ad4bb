//! Synced area backend
//!
//! Values are JSON text, replicated with the profile, and capped by a quota
//! modeled on browser sync storage limits. The area is ready as soon as the
//! database is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backend::{Backend, BackendKind, ChangeStream};
use crate::database::{AreaUsage, Database};
use crate::error::StorageError;
use crate::notifier::{ChangeNotifier, ContextId};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncQuota {
    /// Max bytes of one entry, key included
    pub bytes_per_item: usize,
    /// Max bytes of all entries in one store
    pub total_bytes: usize,
    pub max_items: usize,
}

impl Default for SyncQuota {
    fn default() -> Self {
        Self {
            bytes_per_item: 8_192,
            total_bytes: 102_400,
            max_items: 512,
        }
    }
}

/// One named store in the synced database, shared by every context that
/// binds to it.
#[derive(Clone)]
pub struct SyncArea {
    db: Database,
    store: Arc<str>,
    quota: SyncQuota,
    notifier: ChangeNotifier,
}

impl SyncArea {
    pub fn new(db: Database, store: impl Into<String>, quota: SyncQuota) -> Self {
        let store: String = store.into();
        Self {
            db,
            store: Arc::from(store),
            quota,
            notifier: ChangeNotifier::new(),
        }
    }

    /// A new execution context on this area. Writes made through it reach
    /// the watchers of every other context.
    pub fn context(&self) -> SyncedBackend {
        SyncedBackend {
            area: self.clone(),
            context: self.notifier.next_context(),
        }
    }

    pub fn quota(&self) -> SyncQuota {
        self.quota
    }

    fn check_item(&self, key: &str, item_bytes: usize) -> Result<()> {
        if item_bytes > self.quota.bytes_per_item {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                reason: format!(
                    "item is {} bytes, limit is {}",
                    item_bytes, self.quota.bytes_per_item
                ),
            });
        }
        Ok(())
    }

    /// `usage` excludes any current entry under `key`.
    fn check_usage(&self, key: &str, item_bytes: usize, usage: AreaUsage) -> Result<()> {
        if usage.items + 1 > self.quota.max_items {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                reason: format!("store already holds {} items", usage.items),
            });
        }
        if usage.bytes + item_bytes > self.quota.total_bytes {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                reason: format!(
                    "store would hold {} bytes, limit is {}",
                    usage.bytes + item_bytes,
                    self.quota.total_bytes
                ),
            });
        }
        Ok(())
    }
}

pub struct SyncedBackend {
    area: SyncArea,
    context: ContextId,
}

#[async_trait]
impl Backend for SyncedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Synced
    }

    fn store_name(&self) -> &str {
        &self.area.store
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self.area.db.get_sync_entry(&self.area.store, key)?;
        Ok(value.map(String::into_bytes))
    }

    async fn write(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let text = String::from_utf8(value).map_err(|_| StorageError::NotText(key.to_string()))?;
        let item_bytes = key.len() + text.len();
        self.area.check_item(key, item_bytes)?;
        self.area
            .db
            .put_sync_entry_checked(&self.area.store, key, &text, |usage| {
                self.area.check_usage(key, item_bytes, usage)
            })?;

        tracing::debug!(
            store = %self.area.store,
            key = %key,
            bytes = text.len(),
            "Wrote synced entry"
        );

        self.area
            .notifier
            .publish(self.context, key, Some(text.as_bytes()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.area.db.delete_sync_entry(&self.area.store, key)?;
        tracing::debug!(store = %self.area.store, key = %key, "Deleted synced entry");
        self.area.notifier.publish(self.context, key, None);
        Ok(())
    }

    fn watch(&self, key: &str) -> ChangeStream {
        self.area.notifier.watch(self.context, key)
    }
}
