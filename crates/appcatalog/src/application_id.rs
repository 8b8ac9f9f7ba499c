//! Application identifier codec
//!
//! Identifiers use the wire format `[catalogURL/]namespace/applicationName[:tag]`.
//! A missing or blank tag resolves to `latest`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CatalogError, Result};

pub const DEFAULT_TAG: &str = "latest";

static NAMESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+([a-z0-9-][a-z0-9]+)+[a-z0-9]?$").expect("namespace pattern is valid")
});

/// Unique key of a catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId {
    pub namespace: String,
    pub application_name: String,
    pub tag: String,
}

impl ApplicationId {
    pub fn new(
        namespace: impl Into<String>,
        application_name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        let tag = tag.into();
        Self {
            namespace: namespace.into(),
            application_name: application_name.into(),
            tag: if tag.trim().is_empty() {
                DEFAULT_TAG.to_string()
            } else {
                tag
            },
        }
    }

    /// Parse `namespace/name[:tag]` or `catalogURL/namespace/name[:tag]`
    ///
    /// Returns the embedded catalog URL, if any, alongside the identifier.
    pub fn decompose(raw: &str) -> Result<(Option<String>, Self)> {
        let segments: Vec<&str> = raw.split('/').collect();
        let (catalog_url, namespace, name_part) = match segments.as_slice() {
            [namespace, name_part] => (None, *namespace, *name_part),
            [catalog, namespace, name_part] => (Some(catalog.to_string()), *namespace, *name_part),
            _ => {
                return Err(CatalogError::invalid_format(format!(
                    "application id '{}' must look like [catalog/]namespace/name[:tag]",
                    raw
                )));
            }
        };

        let parts: Vec<&str> = name_part.split(':').collect();
        let (application_name, tag) = match parts.as_slice() {
            [name] => (*name, DEFAULT_TAG),
            [name, tag] if tag.trim().is_empty() => (*name, DEFAULT_TAG),
            [name, tag] => (*name, *tag),
            _ => {
                return Err(CatalogError::invalid_format(format!(
                    "application id '{}' contains more than one tag separator",
                    raw
                )));
            }
        };

        if namespace.is_empty() || application_name.is_empty() {
            return Err(CatalogError::invalid_format(format!(
                "application id '{}' has an empty namespace or name",
                raw
            )));
        }

        if matches!(&catalog_url, Some(url) if url.is_empty()) {
            return Err(CatalogError::invalid_format(format!(
                "application id '{}' has an empty catalog segment",
                raw
            )));
        }

        Ok((catalog_url, Self::new(namespace, application_name, tag)))
    }

    /// Derived document key: `namespace/applicationName:tag`
    pub fn catalog_id(&self) -> String {
        format!("{}/{}:{}", self.namespace, self.application_name, self.tag)
    }

    /// Encode back to wire format, optionally scoped to a catalog
    pub fn to_reference(&self, catalog_url: Option<&str>) -> String {
        match catalog_url {
            Some(url) => format!("{}/{}", url, self.catalog_id()),
            None => self.catalog_id(),
        }
    }
}

impl FromStr for ApplicationId {
    type Err = CatalogError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::decompose(s).map(|(_, id)| id)
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.catalog_id())
    }
}

/// Check a namespace against the catalog naming rules
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if NAMESPACE_PATTERN.is_match(namespace) {
        Ok(())
    } else {
        Err(CatalogError::failed_precondition(format!(
            "namespace '{}' must match {}",
            namespace,
            NAMESPACE_PATTERN.as_str()
        )))
    }
}
