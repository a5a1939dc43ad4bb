//! Notification hub
//!
//! Owns a cell's cache and its listeners. Every cache change, whether from
//! a local write or from another context's write, is committed here and
//! fanned out to listeners in registration order.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

pub type Listener<V> = Arc<dyn Fn(&V) + Send + Sync>;

pub struct NotificationHub<V> {
    cache: RwLock<Option<V>>,
    listeners: Mutex<Vec<(u64, Listener<V>)>>,
    next_id: AtomicU64,
}

impl<V> NotificationHub<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cache: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// The cached value, or `None` before the first commit.
    pub fn snapshot(&self) -> Option<V> {
        self.cache.read().clone()
    }

    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));

        let registry: Arc<dyn ListenerRegistry> = self.clone();
        Subscription {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    /// Replaces the cache and notifies every listener once.
    pub fn commit(&self, value: V) {
        *self.cache.write() = Some(value.clone());
        self.notify(&value);
    }

    /// Commits only if nothing has been committed yet. Keeps a slow warm-up
    /// read from overwriting a newer local write.
    pub fn commit_if_uninitialized(&self, value: V) -> bool {
        {
            let mut cache = self.cache.write();
            if cache.is_some() {
                return false;
            }
            *cache = Some(value.clone());
        }
        self.notify(&value);
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn notify(&self, value: &V) {
        // Listeners run outside the lock so they may subscribe or unsubscribe
        let listeners: Vec<Listener<V>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(value);
        }
    }
}

trait ListenerRegistry: Send + Sync {
    fn remove(&self, id: u64);
}

impl<V> ListenerRegistry for NotificationHub<V>
where
    V: Send + Sync,
{
    fn remove(&self, id: u64) {
        self.listeners.lock().retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener registered;
/// call [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct Subscription {
    id: u64,
    registry: Weak<dyn ListenerRegistry>,
}

impl Subscription {
    /// Removes exactly this listener. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
