//! Core data structures for the application catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::application_id::ApplicationId;
use crate::metadata::{ApplicationMetadata, Logo};

/// Index document describing one tag of an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationInfo {
    /// Derived key, `namespace/applicationName:tag`
    #[serde(rename = "CatalogID")]
    pub catalog_id: String,
    pub namespace: String,
    pub application_name: String,
    pub tag: String,
    pub readme: String,
    /// Raw metadata document text
    pub metadata: String,
    /// Display name parsed from the metadata document
    pub metadata_name: String,
    pub private: bool,
}

impl ApplicationInfo {
    pub fn new(
        id: &ApplicationId,
        readme: impl Into<String>,
        metadata: impl Into<String>,
        metadata_name: impl Into<String>,
        private: bool,
    ) -> Self {
        Self {
            catalog_id: id.catalog_id(),
            namespace: id.namespace.clone(),
            application_name: id.application_name.clone(),
            tag: id.tag.clone(),
            readme: readme.into(),
            metadata: metadata.into(),
            metadata_name: metadata_name.into(),
            private,
        }
    }

    pub fn id(&self) -> ApplicationId {
        ApplicationId::new(&self.namespace, &self.application_name, &self.tag)
    }

    /// Recompute `catalog_id` from the identifying fields
    pub fn with_derived_id(mut self) -> Self {
        self.catalog_id = self.id().catalog_id();
        self
    }
}

/// Cached view of one application across all of its tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSummary {
    pub namespace: String,
    pub application_name: String,
    /// tag -> display name
    pub display_names: BTreeMap<String, String>,
    /// tag -> logos declared by that tag's metadata
    pub logos: BTreeMap<String, Vec<Logo>>,
    pub private: bool,
}

impl AppSummary {
    pub fn from_record(record: &ApplicationInfo, logos: Vec<Logo>) -> Self {
        let mut summary = Self {
            namespace: record.namespace.clone(),
            application_name: record.application_name.clone(),
            display_names: BTreeMap::new(),
            logos: BTreeMap::new(),
            private: record.private,
        };
        summary.merge_tag(record, logos);
        summary
    }

    pub fn merge_tag(&mut self, record: &ApplicationInfo, logos: Vec<Logo>) {
        self.display_names
            .insert(record.tag.clone(), record.metadata_name.clone());
        self.logos.insert(record.tag.clone(), logos);
    }

    pub fn tag_count(&self) -> usize {
        self.display_names.len()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.display_names.keys().map(String::as_str)
    }
}

/// Catalog-wide totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub namespace_count: u64,
    pub application_count: u64,
    pub tag_count: u64,
}

/// Filter for summary listings; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryFilter {
    pub namespace: Option<String>,
    pub private: Option<bool>,
}

impl SummaryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Public applications across every namespace
    pub fn public() -> Self {
        Self {
            namespace: None,
            private: Some(false),
        }
    }

    pub fn namespace(namespace: impl Into<String>, private: Option<bool>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            private,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespace.is_none() && self.private.is_none()
    }
}

/// Last-good aggregate held by the summary cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub applications: Vec<AppSummary>,
    pub summary: Summary,
    #[serde(with = "time::serde::rfc3339")]
    pub refreshed_at: OffsetDateTime,
}

impl CatalogSnapshot {
    pub fn new(applications: Vec<AppSummary>, summary: Summary) -> Self {
        Self {
            applications,
            summary,
            refreshed_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Summary::default())
    }
}

/// Full view of one application tag, as returned by `get`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedApplicationMetadata {
    pub catalog_id: String,
    pub namespace: String,
    pub application_name: String,
    pub tag: String,
    pub readme: String,
    pub metadata_name: String,
    pub private: bool,
    pub metadata: ApplicationMetadata,
}

impl ExtendedApplicationMetadata {
    pub fn new(info: ApplicationInfo, metadata: ApplicationMetadata) -> Self {
        Self {
            catalog_id: info.catalog_id,
            namespace: info.namespace,
            application_name: info.application_name,
            tag: info.tag,
            readme: info.readme,
            metadata_name: info.metadata_name,
            private: info.private,
            metadata,
        }
    }
}
