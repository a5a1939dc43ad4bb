//! Cell error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CellError {
    #[error("Storage error: {0}")]
    Storage(#[from] nexttab_storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Patch for key {key} does not produce a valid value: {reason}")]
    InvalidPatch { key: String, reason: String },
}
