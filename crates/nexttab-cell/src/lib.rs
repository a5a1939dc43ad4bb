//! NextTab Storage Cells
//!
//! A [`StorageCell`] binds one key of one backend to a fallback value and
//! keeps an in-memory copy that subscribers can read without awaiting.
//! - Consumers see only the cell contract, never the backend behind it
//! - Local writes and writes from other contexts go through one notify path
//! - A backend that cannot open degrades the cell to cache-only mode

mod cell;
mod error;
mod hub;
pub mod merge;
mod update;

pub use cell::{CellOptions, StorageCell};
pub use error::CellError;
pub use hub::{Listener, NotificationHub, Subscription};
pub use merge::deep_merge;
pub use update::Update;

pub type Result<T> = std::result::Result<T, CellError>;
