//! CLI error types and conversions

use crate::exporter::ExportError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Export failed
    #[error("export error: {0}")]
    ExportError(#[from] ExportError),

    /// Authentication or HTTP client setup failed
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Config or secrets file could not be loaded
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
