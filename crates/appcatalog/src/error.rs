//! Error types for the application catalog

use thiserror::Error;

use crate::config::ConfigError;
use crate::index::IndexError;
use crate::storage::StorageError;

/// Coarse error classification that transports map onto their status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidFormat,
    FailedPrecondition,
    NotFound,
    PermissionDenied,
    Internal,
}

/// Catalog-level errors
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Blob storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CatalogError {
    /// Classify this error for the caller
    pub fn code(&self) -> ErrorCode {
        match self {
            CatalogError::InvalidFormat(_) => ErrorCode::InvalidFormat,
            CatalogError::FailedPrecondition(_) => ErrorCode::FailedPrecondition,
            CatalogError::NotFound(_) => ErrorCode::NotFound,
            CatalogError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            CatalogError::Internal(_) => ErrorCode::Internal,
            CatalogError::Index(IndexError::NotFound(_)) => ErrorCode::NotFound,
            CatalogError::Index(_) => ErrorCode::Internal,
            CatalogError::Storage(StorageError::NotFound(_)) => ErrorCode::NotFound,
            CatalogError::Storage(StorageError::InvalidKey(_)) => ErrorCode::InvalidFormat,
            CatalogError::Storage(_) => ErrorCode::Internal,
            CatalogError::Config(_) => ErrorCode::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == ErrorCode::NotFound
    }

    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Self::FailedPrecondition(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
