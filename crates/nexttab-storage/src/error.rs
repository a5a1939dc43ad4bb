//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Quota exceeded for key {key}: {reason}")]
    QuotaExceeded { key: String, reason: String },

    #[error("Value for key {0} is not valid UTF-8 text")]
    NotText(String),
}

impl StorageError {
    /// True when the backend could not be opened at all, as opposed to a
    /// single failed operation.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}
