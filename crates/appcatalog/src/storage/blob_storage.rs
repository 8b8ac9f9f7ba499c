//! Blob storage abstraction for application file sets
//!
//! This module provides the core storage trait and in-memory implementation
//! for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::application_id::ApplicationId;
use crate::bundle::FileInfo;

use super::archive;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstraction for per-version file set storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Replace the file set stored for an application version
    async fn store(&self, id: &ApplicationId, files: &[FileInfo]) -> Result<(), StorageError>;

    /// Read back a file set, optionally packed into a single `.tar.gz` entry
    async fn fetch(&self, id: &ApplicationId, compressed: bool)
    -> Result<Vec<FileInfo>, StorageError>;

    /// Delete one application version
    async fn remove_application(&self, id: &ApplicationId) -> Result<(), StorageError>;

    /// Delete every application stored under a namespace
    async fn remove_repository(&self, namespace: &str) -> Result<(), StorageError>;
}

/// Reject path segments that would escape the storage root
pub(crate) fn validate_segment(segment: &str) -> Result<(), StorageError> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(StorageError::InvalidKey(format!(
            "'{}' is not a valid path segment",
            segment
        )));
    }
    Ok(())
}

pub(crate) fn validate_id(id: &ApplicationId) -> Result<(), StorageError> {
    validate_segment(&id.namespace)?;
    validate_segment(&id.application_name)?;
    validate_segment(&id.tag)
}

/// Validate a relative file path inside a file set
pub(crate) fn validate_file_path(path: &str) -> Result<(), StorageError> {
    if path.trim().is_empty() {
        return Err(StorageError::InvalidKey("Path cannot be empty".into()));
    }
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Path cannot be absolute: {}",
            path
        )));
    }
    if path.split(['/', '\\']).any(|part| part == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Path cannot contain '..' segments: {}",
            path
        )));
    }
    Ok(())
}

/// In-memory blob store for testing
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    data: Mutex<HashMap<ApplicationId, Vec<FileInfo>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored application versions
    pub fn len(&self) -> usize {
        self.data.lock().map(|data| data.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &ApplicationId) -> bool {
        self.data
            .lock()
            .map(|data| data.contains_key(id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, id: &ApplicationId, files: &[FileInfo]) -> Result<(), StorageError> {
        validate_id(id)?;
        for file in files {
            validate_file_path(&file.path)?;
        }

        let mut storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;
        storage.insert(id.clone(), files.to_vec());
        Ok(())
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
        compressed: bool,
    ) -> Result<Vec<FileInfo>, StorageError> {
        let mut files = {
            let storage = self
                .data
                .lock()
                .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;
            storage
                .get(id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.catalog_id()))?
        };
        files.sort_by(|a, b| a.path.cmp(&b.path));

        if compressed {
            Ok(vec![archive::compress(id, &files)?])
        } else {
            Ok(files)
        }
    }

    async fn remove_application(&self, id: &ApplicationId) -> Result<(), StorageError> {
        let mut storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;
        storage
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.catalog_id()))
    }

    async fn remove_repository(&self, namespace: &str) -> Result<(), StorageError> {
        let mut storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;
        storage.retain(|id, _| id.namespace != namespace);
        Ok(())
    }
}
