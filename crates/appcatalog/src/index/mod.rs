//! Metadata index: a document store of [`ApplicationInfo`] records
//!
//! Backends implement [`IndexBackend`], a small capability set modelled on a
//! search engine: term-query page scans, upserts, delete-by-query and
//! update-by-query. [`MetadataIndex`] builds the catalog operations on top.

use async_trait::async_trait;
use thiserror::Error;

use crate::application_id::ApplicationId;
use crate::entities::{ApplicationInfo, SummaryFilter};

pub mod aggregate;
pub mod memory_index;
pub mod metadata_index;
pub(crate) mod scan;

#[cfg(feature = "sqlite")]
pub mod sqlite_index;

pub use aggregate::SummaryFolder;
pub use memory_index::MemoryIndex;
pub use metadata_index::{IndexOptions, MetadataIndex};

#[cfg(feature = "sqlite")]
pub use sqlite_index::SqliteIndex;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Found {count} documents for {catalog_id}")]
    Duplicate { catalog_id: String, count: u64 },

    #[error("Index backend error: {0}")]
    Backend(String),

    #[error("Invalid index options: {0}")]
    InvalidOptions(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Conjunction of exact-match terms; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermQuery {
    pub catalog_id: Option<String>,
    pub namespace: Option<String>,
    pub application_name: Option<String>,
    pub private: Option<bool>,
}

impl TermQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: &ApplicationId) -> Self {
        Self {
            catalog_id: Some(id.catalog_id()),
            ..Self::default()
        }
    }

    pub fn by_namespace(namespace: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            ..Self::default()
        }
    }

    pub fn by_application(namespace: &str, application_name: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            application_name: Some(application_name.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, info: &ApplicationInfo) -> bool {
        self.catalog_id.as_ref().is_none_or(|v| *v == info.catalog_id)
            && self.namespace.as_ref().is_none_or(|v| *v == info.namespace)
            && self
                .application_name
                .as_ref()
                .is_none_or(|v| *v == info.application_name)
            && self.private.is_none_or(|v| v == info.private)
    }
}

impl From<&SummaryFilter> for TermQuery {
    fn from(filter: &SummaryFilter) -> Self {
        Self {
            namespace: filter.namespace.clone(),
            private: filter.private,
            ..Self::default()
        }
    }
}

/// Opaque scan position; backends currently encode an offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageToken(u64);

impl PageToken {
    pub fn start() -> Self {
        Self(0)
    }

    pub fn at_offset(offset: u64) -> Self {
        Self(offset)
    }

    pub fn offset(&self) -> u64 {
        self.0
    }
}

/// One page of a scan, sorted by namespace, application name, tag
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub records: Vec<ApplicationInfo>,
    pub next: PageToken,
    /// Total hits the backend reports for the whole query
    pub total: u64,
}

/// Storage capabilities the metadata index needs from a document store
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Create the index if it does not exist yet
    async fn ensure_index(&self) -> Result<(), IndexError>;

    /// Insert or overwrite the document keyed by `doc.catalog_id`
    async fn upsert(&self, doc: &ApplicationInfo) -> Result<(), IndexError>;

    async fn page_scan(
        &self,
        query: &TermQuery,
        token: PageToken,
        page_size: usize,
    ) -> Result<ScanPage, IndexError>;

    /// Returns the number of deleted documents
    async fn delete_by_query(&self, query: &TermQuery) -> Result<u64, IndexError>;

    /// Returns the number of updated documents
    async fn update_private_by_query(
        &self,
        query: &TermQuery,
        private: bool,
    ) -> Result<u64, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_query_matching() {
        let info = ApplicationInfo::new(
            &ApplicationId::new("acme", "widgets", "1.0"),
            "",
            "",
            "Widgets",
            true,
        );

        assert!(TermQuery::all().matches(&info));
        assert!(TermQuery::by_id(&info.id()).matches(&info));
        assert!(TermQuery::by_application("acme", "widgets").matches(&info));
        assert!(!TermQuery::by_application("acme", "gadgets").matches(&info));

        let public_only = TermQuery::from(&SummaryFilter::public());
        assert!(!public_only.matches(&info));
    }
}
