//! Blob storage for application file sets

pub mod archive;
pub mod blob_storage;
pub mod filesystem;

pub use blob_storage::{BlobStore, MemoryBlobStore, StorageError};
pub use filesystem::FilesystemBlobStore;
