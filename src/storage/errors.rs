//! # Storage Errors

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    // Construction errors
    #[error("Invalid namespace \"{0}\": must be non-empty and may not contain '*' or '/'")]
    InvalidNamespace(String),

    // Key errors
    #[error("Key may not be empty")]
    EmptyKey,

    #[error("Key may not contain the '*' wildcard: {0}")]
    WildcardNotAllowed(String),

    #[error("Value may not be null: {0}")]
    MissingValue(String),

    #[error("A value already exists for key: {0}")]
    KeyExists(String),

    #[error("Key does not exist: {0}")]
    KeyNotFound(String),

    // Medium errors
    #[error("Storage medium lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// Stable code string
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::InvalidNamespace(_) => "CRUDDY_STORAGE_INVALID_NAMESPACE",
            StorageError::EmptyKey => "CRUDDY_STORAGE_EMPTY_KEY",
            StorageError::WildcardNotAllowed(_) => "CRUDDY_STORAGE_WILDCARD_NOT_ALLOWED",
            StorageError::MissingValue(_) => "CRUDDY_STORAGE_MISSING_VALUE",
            StorageError::KeyExists(_) => "CRUDDY_STORAGE_KEY_EXISTS",
            StorageError::KeyNotFound(_) => "CRUDDY_STORAGE_KEY_NOT_FOUND",
            StorageError::LockPoisoned => "CRUDDY_STORAGE_LOCK_POISONED",
            StorageError::Io(_) => "CRUDDY_STORAGE_IO",
            StorageError::Corrupt(_) => "CRUDDY_STORAGE_CORRUPT",
        }
    }
}
