//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] nexttab_storage::StorageError),

    #[error("Cell error: {0}")]
    Cell(#[from] nexttab_cell::CellError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid data format: {0}")]
    InvalidBundle(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
