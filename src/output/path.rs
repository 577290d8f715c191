//! Export directory layout
//!
//! ```text
//! <export-root>/<username>/
//!   <org>/<org>.json
//!   <org>/tasks_<a>-<b>.json
//!   <org>/<workspace>/<workspace>.json
//!   <org>/<workspace>/<app>/<app>.json
//!   <org>/<workspace>/<app>/items_<a>-<b>.json
//!   <org>/<workspace>/<app>/files_<a>-<b>.json
//!   <org>/<workspace>/<app>/files/<file-id>.<ext>
//!   contacts_<a>-<b>.json
//!   summary.json
//! ```
//!
//! Page ranges are 1-based and inclusive: the first page of 500 items is
//! `items_1-500.json`, a two item tail after it `items_501-502.json`.

use std::path::{Path, PathBuf};

/// Name of the summary report written at the account root
pub const SUMMARY_FILENAME: &str = "summary.json";

/// Directory (below the app directory) receiving downloaded files
pub const FILES_DIRNAME: &str = "files";

/// Extension used when a MIME type has no known extension
const FALLBACK_EXTENSION: &str = "bin";

/// Root of one export run
#[derive(Debug, Clone)]
pub struct ExportPaths {
    root_dir: PathBuf,
}

impl ExportPaths {
    /// Create a layout rooted at `root_dir`
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Account directory: `<root>/<username>` with `@` spelled `_at_`
    pub fn account_dir(&self, username: &str) -> PathBuf {
        self.root_dir
            .join(sanitize_segment(&username.replace('@', "_at_")))
    }
}

/// Directory of a named child entity below `parent`
pub fn child_dir(parent: &Path, name: &str) -> PathBuf {
    parent.join(sanitize_segment(name))
}

/// Filename of an entity's own record: `<name>.json`
pub fn record_filename(name: &str) -> String {
    format!("{}.json", sanitize_segment(name))
}

/// 1-based inclusive record range covered by a page
pub fn build_range(offset: u64, count: u64) -> String {
    format!("{}-{}", offset + 1, offset + count)
}

/// Filename of one persisted page, e.g. `items_501-502.json`
pub fn page_filename(prefix: &str, offset: u64, count: u64) -> String {
    format!("{prefix}_{}.json", build_range(offset, count))
}

/// Local filename of a downloaded file: `<file-id>.<ext>`
pub fn download_filename(file_id: u64, mimetype: &str) -> String {
    format!("{file_id}.{}", file_extension(mimetype))
}

/// Derive a file extension from a MIME type
///
/// Prefers the MIME subtype when it is itself a known extension
/// (`image/jpeg` -> `jpeg`), otherwise the first known extension, otherwise
/// `bin`.
pub fn file_extension(mimetype: &str) -> String {
    let essence = mimetype
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let Some(extensions) = mime_guess::get_mime_extensions_str(&essence) else {
        return FALLBACK_EXTENSION.to_string();
    };

    let subtype = essence.split('/').nth(1).unwrap_or_default();
    extensions
        .iter()
        .find(|ext| **ext == subtype)
        .or_else(|| extensions.first())
        .map_or_else(|| FALLBACK_EXTENSION.to_string(), |ext| ext.to_string())
}

/// Sanitize an entity name for use as a single path segment
///
/// Prevents path traversal and accidental nesting:
/// - `/`, `\`, `:` -> `_` (directory separators)
/// - `..` -> `__` (parent directory reference)
/// - empty or `.` -> `_`
///
/// Preserves case and everything else.
pub fn sanitize_segment(name: &str) -> String {
    let sanitized = name.replace("..", "__").replace(['/', '\\', ':'], "_");
    if sanitized.is_empty() || sanitized == "." {
        return "_".to_string();
    }
    sanitized
}
