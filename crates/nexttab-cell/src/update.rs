//! Value-or-updater argument of [`StorageCell::apply`](crate::StorageCell::apply)

/// Either a replacement value or a pure transform of the previous value.
///
/// Updaters may be run against a freshly read previous value, so they must
/// not perform I/O.
pub enum Update<V> {
    Value(V),
    With(Box<dyn FnOnce(&V) -> V + Send>),
}

impl<V> Update<V> {
    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(&V) -> V + Send + 'static,
    {
        Update::With(Box::new(f))
    }
}

impl<V> From<V> for Update<V> {
    fn from(value: V) -> Self {
        Update::Value(value)
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for Update<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Update::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Update::With(_) => f.write_str("With(..)"),
        }
    }
}
