//! Catalog configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::index::IndexOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {key} value: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// sqlx connection string of the metadata index
    pub database_url: String,

    /// Root directory of the blob store
    pub blob_path: PathBuf,

    /// Summary cache refresh interval in seconds
    pub refresh_interval_secs: u64,

    /// Page size of index scans
    pub page_size: usize,

    /// Catalog URL that embedded id prefixes must match, if any
    pub catalog_url: Option<String>,

    pub auth_enabled: bool,

    /// Users allowed to act on any team namespace
    pub privileged_users: Vec<String>,

    pub team_namespaces: Vec<String>,
}

impl CatalogConfig {
    /// Load configuration from environment variables, after reading `.env`
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            database_url: lookup("CATALOG_DATABASE_URL").unwrap_or(defaults.database_url),
            blob_path: lookup("CATALOG_BLOB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.blob_path),
            refresh_interval_secs: parse_positive(
                &lookup,
                "CATALOG_REFRESH_INTERVAL_SECS",
                defaults.refresh_interval_secs,
            )?,
            page_size: parse_positive(&lookup, "CATALOG_PAGE_SIZE", defaults.page_size)?,
            catalog_url: lookup("CATALOG_URL").filter(|url| !url.trim().is_empty()),
            auth_enabled: lookup("CATALOG_AUTH_ENABLED")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
            privileged_users: lookup("CATALOG_PRIVILEGED_USERS")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
            team_namespaces: lookup("CATALOG_TEAM_NAMESPACES")
                .map(|s| split_list(&s))
                .unwrap_or_default(),
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            page_size: self.page_size,
            refresh_interval: self.refresh_interval(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/catalog.db".to_string(),
            blob_path: PathBuf::from("./data/blobs"),
            refresh_interval_secs: 60,
            page_size: 100,
            catalog_url: None,
            auth_enabled: false,
            privileged_users: Vec::new(),
            team_namespaces: Vec::new(),
        }
    }
}

/// Parse a strictly positive number, falling back to `default` when unset
fn parse_positive<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    match lookup(key) {
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            match parsed {
                Ok(parsed) if parsed > T::default() => Ok(parsed),
                _ => Err(ConfigError::InvalidValue { key, value }),
            }
        }
        None => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
