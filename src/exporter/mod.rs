//! Export orchestration
//!
//! The exporter walks an account top-down and mirrors it on disk:
//!
//! 1. **Organizations**: `GET /org/`, then for every organization, concurrently,
//!    its record, its tasks and its workspaces
//! 2. **Workspaces**: record and applications, concurrently
//! 3. **Applications**: record, items and files, concurrently
//! 4. **Contacts**: account wide, after all organizations are done
//! 5. **Summary**: written to `summary.json`, then checked for completeness
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use podio_export::exporter::{ExportConfig, ExportExecutor};
//! use podio_export::fetcher::download::HttpFileDownloader;
//! use podio_export::fetcher::podio_http::{build_http_client, PodioHttpClient, DEFAULT_API_BASE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = build_http_client()?;
//! let api = Arc::new(PodioHttpClient::new(client.clone(), DEFAULT_API_BASE, "token"));
//! let downloader = Arc::new(HttpFileDownloader::new(client));
//!
//! let config = ExportConfig::default().with_downloads(true);
//! let executor = ExportExecutor::new(api, downloader, config, "./podio-export");
//! let summary = executor.export_account("me@example.com").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`executor`] - Traversal, fan-out and persistence
//! - [`pagination`] - Offset/limit paging
//! - [`rate_limit`] - Hourly token bucket shared by all requests and downloads
//! - [`summary`] - Summary tree and completeness check
//! - [`config`] - Options and defaults
//!
//! # Error Handling
//!
//! Nothing is retried. The first failure anywhere in the tree aborts the
//! export and surfaces as a single [`ExportError`]; whatever was already
//! written stays on disk.

pub mod config;
pub mod executor;
pub mod pagination;
pub mod rate_limit;
pub mod summary;

pub use config::ExportConfig;
pub use executor::ExportExecutor;
pub use rate_limit::{RateLimitError, RateLimiter};
pub use summary::{AccountSummary, AppSummary, CompletenessError, OrgSummary, Summary, WorkspaceSummary};

use crate::fetcher::download::DownloadError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// API request failed
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),

    /// File download failed
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Writing to the export directory failed
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Rate limiter failure
    #[error("rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),

    /// Source data changed or misbehaved during the export
    #[error("consistency error: {0}")]
    Consistency(String),

    /// The export ran to the end but the summary shows missing data
    #[error("{source}")]
    Validation {
        /// First incomplete application
        source: CompletenessError,
        /// The summary as written to `summary.json`
        summary: Box<Summary>,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl ExportError {
    /// Summary of an export that completed but failed validation
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            ExportError::Validation { summary, .. } => Some(summary),
            _ => None,
        }
    }
}
