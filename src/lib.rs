//! # Podio Export Library
//!
//! Bulk backup of a Podio account to local storage. The exporter walks the
//! account hierarchy (organizations, workspaces, applications), pages through
//! every collection, writes the raw API responses to a directory tree and
//! finishes with a summary report that proves the export is complete.
//!
//! ## Features
//!
//! - **Hierarchical traversal**: organizations, workspaces and applications are
//!   exported concurrently, with a join at every level
//! - **Pagination**: offset/limit paging for items, files, tasks and contacts
//! - **Rate Limiting**: one hourly token bucket shared by every request and download
//! - **File Downloads**: optional download of file attachments and app spreadsheets
//! - **Completeness Check**: the summary tree is validated after the export settles
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use podio_export::exporter::{ExportConfig, ExportExecutor};
//! use podio_export::fetcher::download::HttpFileDownloader;
//! use podio_export::fetcher::podio_http::{build_http_client, PodioHttpClient, DEFAULT_API_BASE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = build_http_client()?;
//! let api = Arc::new(PodioHttpClient::new(client.clone(), DEFAULT_API_BASE, "access-token"));
//! let downloader = Arc::new(HttpFileDownloader::new(client));
//!
//! let executor = ExportExecutor::new(api, downloader, ExportConfig::default(), "./podio-export");
//! let summary = executor.export_account("me@example.com").await?;
//! println!("{}", serde_json::to_string_pretty(&summary)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - API client trait, HTTP implementation, authentication, downloads
//! - [`exporter`] - Traversal engine, pagination, rate limiting, summary validation
//! - [`output`] - JSON persistence and export path layout
//! - [`cli`] - Command line entry point
//! - [`metrics`] - Request, page and download counters

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CLI command implementations
pub mod cli;

/// Export orchestration
pub mod exporter;

/// API access and binary downloads
pub mod fetcher;

/// Metrics collection
pub mod metrics;

/// JSON persistence and path layout
pub mod output;

pub use exporter::{ExportConfig, ExportError, ExportExecutor, Summary};

/// Podio organization as returned by `GET /org/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    /// Organization ID
    pub org_id: u64,
    /// Display name, used as directory and summary key
    pub name: String,
}

/// Podio workspace (space) as returned by `GET /space/org/{org_id}/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workspace {
    /// Space ID
    pub space_id: u64,
    /// Display name
    pub name: String,
}

/// Application configuration block; only the name drives the export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Display name
    pub name: String,
}

/// Podio application as returned by `GET /app/space/{space_id}/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    /// App ID
    pub app_id: u64,
    /// App configuration
    pub config: AppConfig,
}

impl Application {
    /// Display name of the application
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// File entry returned by `GET /file/app/{app_id}/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    /// File ID, used as the local file stem
    pub file_id: u64,
    /// Download link (the access token is appended as a query parameter)
    pub link: String,
    /// MIME type, used to derive the local file extension
    pub mimetype: String,
}

/// One page of `POST /item/app/{app_id}/filter/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemPage {
    /// Item records on this page, kept opaque
    pub items: Vec<Value>,
    /// Total number of items the server reports for the app
    pub total: u64,
}
