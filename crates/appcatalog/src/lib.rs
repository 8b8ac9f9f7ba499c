//! # AppCatalog
//!
//! A versioned application catalog that provides:
//! - Application packages addressed by `namespace/applicationName:tag`
//! - A searchable metadata index backed by SQLite or memory
//! - Per-version file storage on the filesystem
//! - Cached catalog-wide summaries, refreshed on a timer and after writes
//! - Namespace permission checks and per-application visibility
//!
//! ## Core Concepts
//!
//! - **Applications** live in a namespace and are published as immutable tags
//! - **Metadata** is one YAML document per tag, indexed next to the readme
//! - **Visibility** is shared by all tags of an application: public apps stay public
//! - **Summaries** group tags per application and are served from a cache
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use appcatalog::*;
//!
//! # async fn example() -> Result<()> {
//! let config = CatalogConfig::from_env()?;
//! let catalog = Catalog::open(&config).await?;
//!
//! let files = vec![
//!     FileInfo::new(
//!         "metadata.yaml",
//!         "apiVersion: catalog.appcat.dev/v1alpha1\nkind: ApplicationMetadata\nname: Widgets\n",
//!     ),
//!     FileInfo::new("README.md", "# Widgets"),
//! ];
//! catalog.manager.add("acme/widgets:1.0", files, false, Some("alice")).await?;
//!
//! let app = catalog.manager.get("acme/widgets:1.0", true).await?;
//! println!("Published {} ({})", app.metadata_name, app.catalog_id);
//! # catalog.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod application_id;
pub mod bundle;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod entities;
pub mod error;
pub mod index;
pub mod metadata;
pub mod permission;
pub mod storage;
pub mod visibility;

pub use application_id::{ApplicationId, DEFAULT_TAG};
pub use bundle::{ApplicationBundle, FileInfo};
pub use catalog::{ApplicationCatalog, Catalog, CatalogManager};
pub use config::CatalogConfig;
pub use entities::*;
pub use error::{CatalogError, ErrorCode, Result};
pub use index::{IndexBackend, IndexOptions, MemoryIndex, MetadataIndex};
pub use metadata::ApplicationMetadata;
pub use permission::{Claims, PermissionResolver, Role, StaticClaims};
pub use storage::{BlobStore, FilesystemBlobStore, MemoryBlobStore};
pub use visibility::Visibility;

#[cfg(feature = "sqlite")]
pub use index::SqliteIndex;
