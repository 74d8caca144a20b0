//! Error types for the job store

use std::fmt;
use thiserror::Error;

use crate::error::{ErrorCode, SubmitError};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A record with the same id already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn serialization<E: fmt::Display>(err: E) -> Self {
        Self::Serialization(err.to_string())
    }

    pub fn not_found<E: fmt::Display>(item: E) -> Self {
        Self::NotFound(item.to_string())
    }

    pub fn conflict<E: fmt::Display>(msg: E) -> Self {
        Self::Conflict(msg.to_string())
    }

    pub fn unavailable<E: fmt::Display>(msg: E) -> Self {
        Self::Unavailable(msg.to_string())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

impl From<StorageError> for SubmitError {
    fn from(err: StorageError) -> Self {
        let code = match &err {
            StorageError::Io(_) => ErrorCode::PERSISTENCE_INSERT_FAILED,
            StorageError::Serialization(_) => ErrorCode::PERSISTENCE_SERIALIZATION,
            StorageError::NotFound(_) => ErrorCode::PERSISTENCE_NOT_FOUND,
            StorageError::Conflict(_) => ErrorCode::PERSISTENCE_DUPLICATE_ID,
            StorageError::Unavailable(_) => ErrorCode::PERSISTENCE_UNAVAILABLE,
        };
        SubmitError::persistence(code, err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_codes() {
        let err: SubmitError = StorageError::conflict("job 1").into();
        assert_eq!(err.code(), ErrorCode::PERSISTENCE_DUPLICATE_ID);
        assert_eq!(err.category(), "persistence");

        let err: SubmitError = StorageError::unavailable("down").into();
        assert_eq!(err.code(), ErrorCode::PERSISTENCE_UNAVAILABLE);
        assert!(err.to_string().contains("down"));
    }
}
