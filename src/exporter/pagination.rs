//! Offset/limit pagination
//!
//! Two shapes of pagination are used by the exporter:
//!
//! - **Sequential** (tasks, files, contacts): pages at offsets 0, limit,
//!   2*limit, ... are requested one at a time until a page comes back with
//!   fewer than `limit` records. See [`PaginationHelper::paginate`].
//! - **Known total** (items): the first page reports `total`, after which the
//!   remaining offsets are known up front and can be fetched concurrently.
//!   See [`remaining_offsets`].
//!
//! Offsets always advance by `limit`, whatever the size of the page that
//! came back.

use serde_json::{Map, Value};
use std::future::Future;
use std::ops::AddAssign;
use std::path::Path;
use tracing::debug;

use super::ExportError;

/// Maximum number of sequential pages, guards against a server that keeps
/// returning full pages forever
const MAX_ITERATIONS: u64 = 100_000;

/// What one page contributed to the summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTally {
    /// Records on the page
    pub records: u64,
    /// Files downloaded for the page's records
    pub downloaded: u64,
}

impl PageTally {
    /// Tally of a page without downloads
    pub fn records(records: u64) -> Self {
        Self {
            records,
            downloaded: 0,
        }
    }
}

impl AddAssign for PageTally {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.downloaded += other.downloaded;
    }
}

/// A paginated collection and where its pages go
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    /// Page filename prefix, e.g. `tasks`
    pub prefix: &'static str,
    /// API path
    pub path: String,
    /// Parameters sent with every page besides `offset` and `limit`
    pub params: Map<String, Value>,
    /// Page size
    pub limit: u64,
    /// Directory receiving the page files
    pub directory: &'a Path,
}

impl<'a> Collection<'a> {
    /// Describe a collection without extra parameters
    pub fn new(prefix: &'static str, path: impl Into<String>, limit: u64, directory: &'a Path) -> Self {
        Self {
            prefix,
            path: path.into(),
            params: Map::new(),
            limit,
            directory,
        }
    }

    /// Add a parameter sent with every page
    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Parameters of the page at `offset`
    pub fn page_params(&self, offset: u64) -> Value {
        page_params(&self.params, offset, self.limit)
    }
}

/// Merge `offset` and `limit` into a parameter object
pub fn page_params(base: &Map<String, Value>, offset: u64, limit: u64) -> Value {
    let mut params = base.clone();
    params.insert("offset".to_string(), Value::from(offset));
    params.insert("limit".to_string(), Value::from(limit));
    Value::Object(params)
}

/// Offsets of the pages after the first, for a collection of `total` records
///
/// `limit, 2*limit, ...` while the offset is below `total`.
pub fn remaining_offsets(limit: u64, total: u64) -> Vec<u64> {
    if limit == 0 {
        return Vec::new();
    }
    (1..)
        .map(|page| page * limit)
        .take_while(|offset| *offset < total)
        .collect()
}

/// Pagination helper
pub struct PaginationHelper;

impl PaginationHelper {
    /// Walk a collection page by page
    ///
    /// `export_page(offset)` fetches and persists one page and reports what
    /// it contained. The next page is requested only after the previous one
    /// completed, and the walk stops at the first page that does not hold
    /// exactly `limit` records (an empty first page included).
    ///
    /// # Errors
    /// The first error of `export_page`, or [`ExportError::Consistency`]
    /// when the iteration guard trips.
    pub async fn paginate<F, Fut>(limit: u64, mut export_page: F) -> Result<PageTally, ExportError>
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = Result<PageTally, ExportError>>,
    {
        let mut tally = PageTally::default();
        let mut offset = 0;
        let mut iteration = 0;

        loop {
            if iteration >= MAX_ITERATIONS {
                return Err(ExportError::Consistency(format!(
                    "Max iterations ({MAX_ITERATIONS}) exceeded at offset {offset} - possible infinite loop"
                )));
            }

            let page = export_page(offset).await?;
            debug!(offset, records = page.records, "Page exported");
            tally += page;

            if page.records != limit {
                break;
            }

            offset += limit;
            iteration += 1;
        }

        debug!(
            pages = iteration + 1,
            records = tally.records,
            "Pagination completed"
        );
        Ok(tally)
    }
}
