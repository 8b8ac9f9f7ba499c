//! Application metadata files
//!
//! Every published application carries exactly one YAML metadata document
//! whose `apiVersion`/`kind` pair is on [`METADATA_KINDS`]. Other YAML files in
//! a file set must at least declare a parseable group/version/kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recognised `(apiVersion, kind)` pairs for the metadata document
pub const METADATA_KINDS: &[(&str, &str)] = &[
    ("catalog.appcat.dev/v1alpha1", "ApplicationMetadata"),
    ("core.oam.dev/v1beta1", "ApplicationMetadata"),
];

/// Parsed application metadata document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationMetadata {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    /// Display name, required
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Requirements>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logo: Vec<Logo>,
}

/// Platform capabilities an application depends on
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub k8s_entities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Logo {
    #[serde(default)]
    pub src: String,
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub size: String,
}

/// Group, version and kind declared by a YAML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVersionKind {
    /// Empty for the core group (`apiVersion: v1`)
    pub group: String,
    pub version: String,
    pub kind: String,
}

/// The `apiVersion`/`kind` pair every resource document starts with
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TypeHeader {
    #[serde(default)]
    pub(crate) api_version: String,
    #[serde(default)]
    pub(crate) kind: String,
}

impl TypeHeader {
    pub(crate) fn from_yaml(text: &str) -> Result<Self, MetadataError> {
        serde_yaml::from_str(text).map_err(MetadataError::Yaml)
    }

    /// Headers of every non-empty document in a `---` separated stream
    pub(crate) fn all_from_yaml(text: &str) -> Result<Vec<Self>, MetadataError> {
        let mut headers = Vec::new();
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = serde_yaml::Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            headers.push(serde_yaml::from_value(value)?);
        }
        Ok(headers)
    }

    pub(crate) fn is_metadata_kind(&self) -> bool {
        ApplicationMetadata::is_metadata_kind(&self.api_version, &self.kind)
    }
}

impl ApplicationMetadata {
    /// Parse a metadata document from YAML text
    pub fn from_yaml(text: &str) -> Result<Self, MetadataError> {
        serde_yaml::from_str(text).map_err(MetadataError::Yaml)
    }

    /// Whether the declared type is one of the recognised metadata kinds
    pub fn is_metadata_kind(api_version: &str, kind: &str) -> bool {
        METADATA_KINDS
            .iter()
            .any(|(v, k)| *v == api_version && *k == kind)
    }

    /// Check the fields a catalog entry cannot do without
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::EmptyName);
        }
        Ok(())
    }
}

impl GroupVersionKind {
    /// Read the `apiVersion`/`kind` header of an arbitrary YAML document
    pub fn from_yaml(text: &str) -> Result<Self, MetadataError> {
        let header = TypeHeader::from_yaml(text)?;
        Self::parse(&header.api_version, &header.kind)
    }

    pub fn parse(api_version: &str, kind: &str) -> Result<Self, MetadataError> {
        if kind.trim().is_empty() {
            return Err(MetadataError::MissingKind);
        }

        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        if version.trim().is_empty() || version.contains('/') {
            return Err(MetadataError::InvalidApiVersion(api_version.to_string()));
        }

        Ok(Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        })
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

/// Errors raised while reading metadata or resource files
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("metadata name cannot be empty")]
    EmptyName,

    #[error("missing kind")]
    MissingKind,

    #[error("invalid apiVersion '{0}'")]
    InvalidApiVersion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGETS: &str = r#"
apiVersion: catalog.appcat.dev/v1alpha1
kind: ApplicationMetadata
name: Widgets
version: 1.0.0
description: Widget factory
keywords: [widgets, factory]
license: Apache-2.0
requires:
  traits: [scaler]
  k8sEntities: [Deployment]
logo:
  - src: https://example.com/widgets.png
    type: image/png
    size: 64x64
"#;

    #[test]
    fn test_parse_full_document() {
        let metadata = ApplicationMetadata::from_yaml(WIDGETS).unwrap();
        assert_eq!(metadata.name, "Widgets");
        assert_eq!(metadata.version.as_deref(), Some("1.0.0"));
        assert_eq!(metadata.keywords, vec!["widgets", "factory"]);
        let requires = metadata.requires.as_ref().unwrap();
        assert_eq!(requires.traits, vec!["scaler"]);
        assert_eq!(requires.k8s_entities, vec!["Deployment"]);
        assert!(requires.scopes.is_empty());
        assert_eq!(metadata.logo.len(), 1);
        assert_eq!(metadata.logo[0].media_type, "image/png");
        assert!(metadata.validate().is_ok());
        assert!(ApplicationMetadata::is_metadata_kind(
            &metadata.api_version,
            &metadata.kind
        ));
    }

    #[test]
    fn test_empty_name_rejected() {
        let metadata = ApplicationMetadata::from_yaml(
            "apiVersion: catalog.appcat.dev/v1alpha1\nkind: ApplicationMetadata\nname: '  '\n",
        )
        .unwrap();
        assert!(matches!(metadata.validate(), Err(MetadataError::EmptyName)));
    }

    #[test]
    fn test_unknown_kind_not_metadata() {
        assert!(!ApplicationMetadata::is_metadata_kind("apps/v1", "Deployment"));
        assert!(!ApplicationMetadata::is_metadata_kind(
            "catalog.appcat.dev/v1alpha1",
            "Deployment"
        ));
    }

    #[test]
    fn test_group_version_kind() {
        let gvk = GroupVersionKind::from_yaml("apiVersion: apps/v1\nkind: Deployment\n").unwrap();
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Deployment");
        assert_eq!(gvk.api_version(), "apps/v1");

        let core = GroupVersionKind::from_yaml("apiVersion: v1\nkind: ConfigMap\n").unwrap();
        assert_eq!(core.group, "");
        assert_eq!(core.api_version(), "v1");
    }

    #[test]
    fn test_headers_of_multi_document_stream() {
        let headers = TypeHeader::all_from_yaml(
            "apiVersion: v1\nkind: Service\n---\napiVersion: apps/v1\nkind: Deployment\n---\n",
        )
        .unwrap();
        let kinds: Vec<_> = headers.iter().map(|h| h.kind.as_str()).collect();
        assert_eq!(kinds, vec!["Service", "Deployment"]);
        assert!(TypeHeader::all_from_yaml("").unwrap().is_empty());
    }

    #[test]
    fn test_group_version_kind_errors() {
        assert!(matches!(
            GroupVersionKind::from_yaml("apiVersion: v1\n"),
            Err(MetadataError::MissingKind)
        ));
        assert!(matches!(
            GroupVersionKind::from_yaml("kind: Deployment\n"),
            Err(MetadataError::InvalidApiVersion(_))
        ));
        assert!(matches!(
            GroupVersionKind::from_yaml("apiVersion: a/b/c\nkind: X\n"),
            Err(MetadataError::InvalidApiVersion(_))
        ));
        assert!(matches!(
            GroupVersionKind::from_yaml("[not: a, mapping"),
            Err(MetadataError::Yaml(_))
        ));
    }
}
