//! Export configuration
//!
//! Read from `config.json`; keys are SCREAMING_SNAKE_CASE and every key is
//! optional. Unknown keys are ignored so older config files keep working.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ExportError;

/// Default rate limit: requests (and downloads) per hour.
/// Podio allows 5,000 requests per hour for most endpoints.
pub const DEFAULT_RATE_LIMIT: usize = 5_000;

/// Default bound on concurrent item page requests and file downloads
pub const DEFAULT_EACH_LIMIT: usize = 5;

/// Items per page (`POST /item/app/{id}/filter/` accepts up to 500)
pub const DEFAULT_ITEMS_LIMIT: u64 = 500;

/// Tasks per page
pub const DEFAULT_TASKS_LIMIT: u64 = 100;

/// File entries per page
pub const DEFAULT_FILES_LIMIT: u64 = 100;

/// Contacts per page
pub const DEFAULT_CONTACTS_LIMIT: u64 = 500;

/// Options consumed by the exporter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ExportConfig {
    /// Tokens per hour in the shared rate limiter
    pub rate_limit: usize,
    /// Maximum in-flight item page requests and downloads per application
    pub each_limit: usize,
    /// Download file attachments into `<app>/files/`
    pub should_download_files: bool,
    /// Download each application's items as `<app>.xlsx`
    pub should_download_xlsx: bool,
    /// Page size for items
    pub items_limit: u64,
    /// Page size for tasks
    pub tasks_limit: u64,
    /// Page size for file entries
    pub files_limit: u64,
    /// Page size for contacts
    pub contacts_limit: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            each_limit: DEFAULT_EACH_LIMIT,
            should_download_files: false,
            should_download_xlsx: false,
            items_limit: DEFAULT_ITEMS_LIMIT,
            tasks_limit: DEFAULT_TASKS_LIMIT,
            files_limit: DEFAULT_FILES_LIMIT,
            contacts_limit: DEFAULT_CONTACTS_LIMIT,
        }
    }
}

impl ExportConfig {
    /// Load and validate a config file
    pub async fn from_file(path: &Path) -> Result<Self, ExportError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ExportError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            ExportError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Enable or disable file downloads
    pub fn with_downloads(mut self, enabled: bool) -> Self {
        self.should_download_files = enabled;
        self
    }

    /// Set the concurrency bound
    pub fn with_each_limit(mut self, each_limit: usize) -> Self {
        self.each_limit = each_limit;
        self
    }

    /// Reject values that would stall or loop the export
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.rate_limit == 0 {
            return Err(ExportError::Config("RATE_LIMIT must be at least 1".to_string()));
        }
        if self.each_limit == 0 {
            return Err(ExportError::Config("EACH_LIMIT must be at least 1".to_string()));
        }
        for (key, value) in [
            ("ITEMS_LIMIT", self.items_limit),
            ("TASKS_LIMIT", self.tasks_limit),
            ("FILES_LIMIT", self.files_limit),
            ("CONTACTS_LIMIT", self.contacts_limit),
        ] {
            if value == 0 {
                return Err(ExportError::Config(format!("{key} must be at least 1")));
            }
        }
        Ok(())
    }
}
