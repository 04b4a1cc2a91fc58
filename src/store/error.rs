//! Store error types
//!
//! Defines all errors that can occur at the storage boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the persistent store
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite-level failure (constraint violation, corrupt file, etc.)
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Cannot open the database file
    #[error("cannot open database {path}: {error}")]
    Open { path: PathBuf, error: String },

    /// Requested index does not exist
    #[error("no such index: {0}")]
    IndexNotFound(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::IndexNotFound("fast_key_index".to_string());
        assert_eq!(err.to_string(), "no such index: fast_key_index");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let store_err: StoreError = io_err.into();
        assert!(matches!(store_err, StoreError::Io(_)));
    }
}
