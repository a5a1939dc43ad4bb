//! Cross-context change fan-out
//!
//! Each handle on an area is an execution context. A write through one
//! context is published to the watchers of every other context.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::backend::{ChangeEvent, ChangeStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

struct Watcher {
    context: ContextId,
    key: String,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Clone, Default)]
pub struct ChangeNotifier {
    watchers: Arc<Mutex<Vec<Watcher>>>,
    next_context: Arc<AtomicU64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_context(&self) -> ContextId {
        ContextId(self.next_context.fetch_add(1, Ordering::Relaxed))
    }

    pub fn watch(&self, context: ContextId, key: &str) -> ChangeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watchers.lock().push(Watcher {
            context,
            key: key.to_string(),
            tx,
        });
        rx
    }

    /// Delivers a change to every watcher of `key` outside `origin`.
    /// Watchers whose receiver has been dropped are pruned.
    pub fn publish(&self, origin: ContextId, key: &str, new_value: Option<&[u8]>) {
        let mut watchers = self.watchers.lock();
        watchers.retain(|watcher| {
            if watcher.context == origin || watcher.key != key {
                return !watcher.tx.is_closed();
            }
            let event = ChangeEvent {
                key: key.to_string(),
                new_value: new_value.map(<[u8]>::to_vec),
            };
            watcher.tx.send(event).is_ok()
        });
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().len()
    }
}
