use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::metadata::{ApplicationMetadata, GroupVersionKind, MetadataError, TypeHeader};

/// A single file of an application version, addressed by its relative path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Relative path using `/` separators, e.g. `templates/deployment.yaml`
    pub path: String,
    pub content: Vec<u8>,
}

impl FileInfo {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn is_yaml(&self) -> bool {
        let lower = self.path.to_ascii_lowercase();
        lower.ends_with(".yaml") || lower.ends_with(".yml")
    }

    /// Only a top-level README counts as the application readme
    pub fn is_readme(&self) -> bool {
        self.path.eq_ignore_ascii_case("readme.md")
    }
}

/// A validated file set ready to be published
#[derive(Debug, Clone)]
pub struct ApplicationBundle {
    readme: String,
    metadata_text: String,
    metadata: ApplicationMetadata,
    files: Vec<FileInfo>,
}

impl ApplicationBundle {
    /// Validate a file set and pull out its readme and metadata document
    pub fn from_files(files: Vec<FileInfo>) -> Result<Self, BundleError> {
        let mut readme = String::new();
        let mut metadata: Option<(String, String)> = None;

        for file in &files {
            if file.is_readme() {
                readme = String::from_utf8_lossy(&file.content).into_owned();
                continue;
            }
            if !file.is_yaml() {
                continue;
            }

            let text = std::str::from_utf8(&file.content)
                .map_err(|_| BundleError::InvalidUtf8(file.path.clone()))?;
            let invalid = |source| BundleError::InvalidResource {
                path: file.path.clone(),
                source,
            };
            let headers = TypeHeader::all_from_yaml(text).map_err(invalid)?;

            match headers.as_slice() {
                // only a single-document file can be the metadata file
                [header] if header.is_metadata_kind() => {
                    if let Some((existing, _)) = &metadata {
                        return Err(BundleError::DuplicateMetadata {
                            first: existing.clone(),
                            second: file.path.clone(),
                        });
                    }
                    metadata = Some((file.path.clone(), text.to_string()));
                }
                [] => return Err(invalid(MetadataError::MissingKind)),
                documents => {
                    for header in documents {
                        GroupVersionKind::parse(&header.api_version, &header.kind)
                            .map_err(invalid)?;
                    }
                }
            }
        }

        let (path, metadata_text) = metadata.ok_or(BundleError::MissingMetadata)?;
        let parsed = ApplicationMetadata::from_yaml(&metadata_text)
            .map_err(|source| BundleError::InvalidResource { path, source })?;
        parsed.validate().map_err(|_| BundleError::EmptyName)?;

        Ok(Self {
            readme,
            metadata_text,
            metadata: parsed,
            files,
        })
    }

    pub fn readme(&self) -> &str {
        &self.readme
    }

    /// Raw metadata document as uploaded
    pub fn metadata_text(&self) -> &str {
        &self.metadata_text
    }

    pub fn metadata(&self) -> &ApplicationMetadata {
        &self.metadata
    }

    pub fn display_name(&self) -> &str {
        &self.metadata.name
    }

    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    pub fn into_files(self) -> Vec<FileInfo> {
        self.files
    }
}

/// Errors that can occur during file set validation
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("no application metadata file found")]
    MissingMetadata,

    #[error("application metadata name cannot be empty")]
    EmptyName,

    #[error("more than one metadata file: {first} and {second}")]
    DuplicateMetadata { first: String, second: String },

    #[error("invalid resource file {path}: {source}")]
    InvalidResource {
        path: String,
        #[source]
        source: MetadataError,
    },

    #[error("file {0} is not valid UTF-8")]
    InvalidUtf8(String),
}

impl From<BundleError> for CatalogError {
    fn from(err: BundleError) -> Self {
        match err {
            BundleError::MissingMetadata => CatalogError::NotFound(err.to_string()),
            BundleError::EmptyName | BundleError::DuplicateMetadata { .. } => {
                CatalogError::FailedPrecondition(err.to_string())
            }
            BundleError::InvalidResource { .. } | BundleError::InvalidUtf8(_) => {
                CatalogError::InvalidFormat(err.to_string())
            }
        }
    }
}
