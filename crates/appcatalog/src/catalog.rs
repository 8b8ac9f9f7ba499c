//! High-level catalog interface for application management

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::application_id::{ApplicationId, validate_namespace};
use crate::bundle::{ApplicationBundle, FileInfo};
use crate::config::CatalogConfig;
use crate::entities::{
    AppSummary, ApplicationInfo, CatalogSnapshot, ExtendedApplicationMetadata, SummaryFilter,
};
use crate::error::{CatalogError, Result};
use crate::index::MetadataIndex;
use crate::metadata::ApplicationMetadata;
use crate::permission::PermissionResolver;
use crate::storage::{BlobStore, StorageError};
use crate::visibility::Visibility;

/// High-level catalog interface
#[async_trait]
pub trait ApplicationCatalog: Send + Sync {
    /// Publish a file set under `raw_id`, returning the resulting visibility
    async fn add(
        &self,
        raw_id: &str,
        files: Vec<FileInfo>,
        is_private: bool,
        acting_account: Option<&str>,
    ) -> Result<bool>;

    /// Read back a published file set
    async fn download(
        &self,
        raw_id: &str,
        compressed: bool,
        is_access_allowed: bool,
    ) -> Result<Vec<FileInfo>>;

    async fn remove(&self, raw_id: &str) -> Result<()>;

    /// Delete a whole namespace, returning the number of removed tags
    async fn remove_namespace(&self, namespace: &str) -> Result<u64>;

    async fn get(
        &self,
        raw_id: &str,
        is_access_allowed: bool,
    ) -> Result<ExtendedApplicationMetadata>;

    /// Summaries visible to the caller
    ///
    /// `account_visibility` maps each account namespace to the visibility
    /// filter applied to it; `None` lists both private and public.
    async fn list(
        &self,
        account_visibility: &BTreeMap<String, Option<bool>>,
        include_public: bool,
    ) -> Result<Vec<AppSummary>>;

    /// Cached aggregate over the whole catalog
    fn summary(&self) -> Arc<CatalogSnapshot>;

    async fn update_visibility(
        &self,
        namespace: &str,
        application_name: &str,
        private: bool,
    ) -> Result<()>;
}

/// Default implementation of the application catalog
pub struct CatalogManager {
    index: Arc<MetadataIndex>,
    blobs: Arc<dyn BlobStore>,
    catalog_url: Option<String>,
}

impl CatalogManager {
    pub fn new(index: Arc<MetadataIndex>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            index,
            blobs,
            catalog_url: None,
        }
    }

    /// Only accept embedded catalog prefixes equal to `catalog_url`
    pub fn with_catalog_url(mut self, catalog_url: impl Into<String>) -> Self {
        self.catalog_url = Some(catalog_url.into());
        self
    }

    pub fn index(&self) -> &Arc<MetadataIndex> {
        &self.index
    }

    fn decode(&self, raw_id: &str) -> Result<ApplicationId> {
        let (catalog_url, id) = ApplicationId::decompose(raw_id)?;
        if let (Some(expected), Some(actual)) = (&self.catalog_url, &catalog_url) {
            if expected != actual {
                return Err(CatalogError::invalid_format(format!(
                    "application id '{}' belongs to catalog '{}', not '{}'",
                    raw_id, actual, expected
                )));
            }
        }
        Ok(id)
    }

    async fn visible_info(
        &self,
        id: &ApplicationId,
        is_access_allowed: bool,
    ) -> Result<ApplicationInfo> {
        let info = self.index.get(id).await?;
        if info.private && !is_access_allowed {
            // private applications are indistinguishable from missing ones
            return Err(CatalogError::not_found(id.catalog_id()));
        }
        Ok(info)
    }

    async fn compensate(&self, id: &ApplicationId) {
        if let Err(err) = self.index.remove(id).await {
            error!(
                catalog_id = %id,
                error = %err,
                "failed to remove index document after blob write failure"
            );
        }
    }

    pub async fn shutdown(&self) {
        self.index.shutdown().await;
    }
}

#[async_trait]
impl ApplicationCatalog for CatalogManager {
    async fn add(
        &self,
        raw_id: &str,
        files: Vec<FileInfo>,
        is_private: bool,
        acting_account: Option<&str>,
    ) -> Result<bool> {
        let id = self.decode(raw_id)?;
        validate_namespace(&id.namespace)?;
        let bundle = ApplicationBundle::from_files(files)?;

        let private = match acting_account.filter(|account| !account.is_empty()) {
            Some(_) => {
                let current = self
                    .index
                    .get_application_visibility(&id.namespace, &id.application_name)
                    .await?;
                Visibility::from(current).on_add(is_private)?
            }
            None => is_private,
        };

        let info = ApplicationInfo::new(
            &id,
            bundle.readme(),
            bundle.metadata_text(),
            bundle.display_name(),
            private,
        );
        self.index.add(info).await?;

        if let Err(err) = self.blobs.store(&id, bundle.files()).await {
            self.compensate(&id).await;
            return Err(err.into());
        }

        info!(
            catalog_id = %id,
            private,
            files = bundle.files().len(),
            "added application"
        );
        Ok(private)
    }

    async fn download(
        &self,
        raw_id: &str,
        compressed: bool,
        is_access_allowed: bool,
    ) -> Result<Vec<FileInfo>> {
        let id = self.decode(raw_id)?;
        self.visible_info(&id, is_access_allowed).await?;
        Ok(self.blobs.fetch(&id, compressed).await?)
    }

    async fn remove(&self, raw_id: &str) -> Result<()> {
        let id = self.decode(raw_id)?;
        self.index.remove(&id).await?;

        match self.blobs.remove_application(&id).await {
            Ok(()) => {}
            Err(StorageError::NotFound(path)) => {
                warn!(catalog_id = %id, path, "no stored files for removed application");
            }
            Err(err) => return Err(err.into()),
        }

        info!(catalog_id = %id, "removed application");
        Ok(())
    }

    async fn remove_namespace(&self, namespace: &str) -> Result<u64> {
        let deleted = self.index.remove_namespace(namespace).await?;
        self.blobs.remove_repository(namespace).await?;
        info!(namespace, deleted, "removed namespace");
        Ok(deleted)
    }

    async fn get(
        &self,
        raw_id: &str,
        is_access_allowed: bool,
    ) -> Result<ExtendedApplicationMetadata> {
        let id = self.decode(raw_id)?;
        let info = self.visible_info(&id, is_access_allowed).await?;
        let metadata = ApplicationMetadata::from_yaml(&info.metadata).map_err(|e| {
            CatalogError::internal(format!("stored metadata of {} is unreadable: {}", id, e))
        })?;
        Ok(ExtendedApplicationMetadata::new(info, metadata))
    }

    async fn list(
        &self,
        account_visibility: &BTreeMap<String, Option<bool>>,
        include_public: bool,
    ) -> Result<Vec<AppSummary>> {
        let mut filters = Vec::with_capacity(account_visibility.len() + 1);
        if include_public {
            filters.push(SummaryFilter::public());
        }
        filters.extend(
            account_visibility
                .iter()
                .map(|(account, private)| SummaryFilter::namespace(account.clone(), *private)),
        );

        let mut applications = Vec::new();
        for filter in &filters {
            let (summaries, _) = self.index.list_summary_with_filter(filter).await?;
            applications.extend(summaries);
        }
        Ok(applications)
    }

    fn summary(&self) -> Arc<CatalogSnapshot> {
        self.index.list_summary()
    }

    async fn update_visibility(
        &self,
        namespace: &str,
        application_name: &str,
        private: bool,
    ) -> Result<()> {
        let current = self
            .index
            .get_application_visibility(namespace, application_name)
            .await?;
        let private = Visibility::from(current).on_toggle(private)?;
        self.index
            .update_application_visibility(namespace, application_name, private)
            .await?;
        Ok(())
    }
}

/// A catalog wired from configuration
pub struct Catalog {
    pub manager: CatalogManager,
    pub permissions: PermissionResolver,
}

impl Catalog {
    /// Connect the SQLite index and filesystem blob store named by `config`
    #[cfg(feature = "sqlite")]
    pub async fn open(config: &CatalogConfig) -> Result<Self> {
        use crate::index::SqliteIndex;
        use crate::storage::FilesystemBlobStore;

        let backend = Arc::new(SqliteIndex::new(&config.database_url).await?);
        let index = MetadataIndex::open(backend, config.index_options()).await?;
        let blobs = Arc::new(FilesystemBlobStore::new(&config.blob_path));
        Ok(Self::from_parts(config, Arc::new(index), blobs))
    }

    pub fn from_parts(
        config: &CatalogConfig,
        index: Arc<MetadataIndex>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let mut manager = CatalogManager::new(index, blobs);
        if let Some(url) = &config.catalog_url {
            manager = manager.with_catalog_url(url.clone());
        }

        let permissions = PermissionResolver::new(
            config.auth_enabled,
            config.privileged_users.iter().cloned(),
            config.team_namespaces.iter().cloned(),
        );

        info!(
            blob_path = %config.blob_path.display(),
            auth_enabled = config.auth_enabled,
            "catalog opened"
        );
        Self {
            manager,
            permissions,
        }
    }

    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
    }
}
