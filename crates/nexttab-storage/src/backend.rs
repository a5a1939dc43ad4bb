//! Backend adapter contract
//!
//! Every durable store a cell can bind to implements [`Backend`]: keyed
//! read/write/delete of opaque bytes plus a per-key stream of changes made
//! by other execution contexts. Callers never depend on which area sits
//! behind the trait object.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Small, quota-limited, replicated across devices, ready immediately
    Synced,
    /// Unlimited, binary-safe, device-only, opened on first use
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Synced => "synced",
            BackendKind::Local => "local",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A write or delete observed on a key by a context other than the watcher's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    /// `None` when the key was deleted
    pub new_value: Option<Vec<u8>>,
}

/// Inbound external change events for one watched key.
pub type ChangeStream = mpsc::UnboundedReceiver<ChangeEvent>;

#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Name of the store inside the area this handle is bound to.
    fn store_name(&self) -> &str;

    /// Makes the backend ready for use.
    ///
    /// Returns [`StorageError::Unavailable`](crate::StorageError::Unavailable)
    /// when the backend can never be used from this context. Calling it again
    /// after a failure returns the same failure without retrying.
    async fn open(&self) -> Result<()> {
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn write(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Subscribes to writes and deletes of `key` made through other handles.
    /// The stream ends when the backend's notifier is dropped.
    fn watch(&self, key: &str) -> ChangeStream;
}
