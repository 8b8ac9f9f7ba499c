//! Filesystem-backed blob store
//!
//! Files live at `${base_path}/${namespace}/${application}/${tag}/${relative_path}`.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::application_id::ApplicationId;
use crate::bundle::FileInfo;

use super::archive;
use super::blob_storage::{
    BlobStore, StorageError, validate_file_path, validate_id, validate_segment,
};

pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn application_dir(&self, id: &ApplicationId) -> Result<PathBuf, StorageError> {
        validate_id(id)?;
        Ok(self
            .base_path
            .join(&id.namespace)
            .join(&id.application_name)
            .join(&id.tag))
    }

    /// Collect every file below `root`, keyed by its `/`-separated relative path
    async fn collect_files(&self, root: &Path) -> Result<Vec<FileInfo>, StorageError> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }

                let relative = path.strip_prefix(root).map_err(|_| {
                    StorageError::Backend(format!("{} escaped {}", path.display(), root.display()))
                })?;
                let relative = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                let content = fs::read(&path).await?;
                files.push(FileInfo::new(relative, content));
            }
        }

        Ok(files)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn store(&self, id: &ApplicationId, files: &[FileInfo]) -> Result<(), StorageError> {
        let dir = self.application_dir(id)?;
        for file in files {
            validate_file_path(&file.path)?;
        }

        if fs::try_exists(&dir).await? {
            fs::remove_dir_all(&dir).await?;
        }
        fs::create_dir_all(&dir).await?;

        for file in files {
            let target = dir.join(&file.path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&target, &file.content).await?;
        }

        debug!(
            application = %id,
            files = files.len(),
            path = %dir.display(),
            "stored application files"
        );
        Ok(())
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
        compressed: bool,
    ) -> Result<Vec<FileInfo>, StorageError> {
        let dir = self.application_dir(id)?;
        if !fs::try_exists(&dir).await? {
            return Err(StorageError::NotFound(id.catalog_id()));
        }

        let mut files = self.collect_files(&dir).await?;
        files.sort_by(|a, b| a.path.cmp(&b.path));

        if compressed {
            Ok(vec![archive::compress(id, &files)?])
        } else {
            Ok(files)
        }
    }

    async fn remove_application(&self, id: &ApplicationId) -> Result<(), StorageError> {
        let dir = self.application_dir(id)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(id.catalog_id()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_repository(&self, namespace: &str) -> Result<(), StorageError> {
        validate_segment(namespace)?;
        match fs::remove_dir_all(self.base_path.join(namespace)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
