//! JSON persistence for exported records
//!
//! Every API response the exporter keeps ends up on disk through
//! [`persist_json`]; [`path`] decides where.

use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::metrics;

pub mod path;

pub use path::{file_extension, page_filename, sanitize_segment, ExportPaths};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error, message carries the full target path
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Serialize `value` as pretty JSON
///
/// One-space indentation keeps the files identical to earlier exports.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> OutputResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    Ok(buffer)
}

/// Write `value` as `<directory>/<filename>`, creating `directory` first
///
/// The document is serialized up front and written with a single call.
///
/// # Errors
/// [`OutputError::IoError`] naming the full path when the directory cannot be
/// created or the file cannot be written.
pub async fn persist_json<T: Serialize + ?Sized>(
    directory: &Path,
    filename: &str,
    value: &T,
) -> OutputResult<()> {
    tokio::fs::create_dir_all(directory).await.map_err(|e| {
        OutputError::IoError(format!(
            "Failed to create directory {}: {e}",
            directory.display()
        ))
    })?;

    let full_path = directory.join(filename);
    let contents = to_pretty_json(value)?;

    tokio::fs::write(&full_path, contents)
        .await
        .map_err(|e| OutputError::IoError(format!("Writing to {} failed: {e}", full_path.display())))?;

    metrics::record_persisted_file();
    info!("Exported {}", full_path.display());
    Ok(())
}
