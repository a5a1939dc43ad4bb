//! NextTab Storage Layer
//!
//! Backend adapters for the two durable areas a NextTab profile writes to:
//! - the synced area: small, quota-limited, replicated, ready immediately
//! - the local area: unlimited and binary-safe, device-only, opened lazily
//!
//! Both sit on SQLite and expose the same [`Backend`] contract.

mod backend;
mod database;
mod error;
mod local;
mod migrations;
mod notifier;
mod synced;

pub use backend::{Backend, BackendKind, ChangeEvent, ChangeStream};
pub use database::{AreaUsage, Database};
pub use error::StorageError;
pub use local::{LocalBackend, LocalStore};
pub use notifier::{ChangeNotifier, ContextId};
pub use synced::{SyncArea, SyncQuota, SyncedBackend};

pub type Result<T> = std::result::Result<T, StorageError>;
