//! API access for the exporter
//!
//! Everything the traversal engine needs from the outside world goes through
//! two narrow seams:
//!
//! - [`PodioApi`] - authenticated JSON requests (`request(method, path, params)`)
//! - [`download::FileDownloader`] - streaming a remote file to a local path
//!
//! Production implementations live in [`podio_http`] and [`download`];
//! tests substitute in-memory mocks.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod auth;
pub mod download;
pub mod podio_http;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-success HTTP status
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// Authentication failed
    #[error("authentication error: {0}")]
    AuthError(String),

    /// Response did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// HTTP method of an API request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read request, params are sent as query string
    Get,
    /// Filter request, params are sent as JSON body
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// Authenticated access to the Podio REST API
#[async_trait]
pub trait PodioApi: Send + Sync {
    /// Issue one request and return the decoded JSON body
    ///
    /// # Arguments
    /// * `method` - REST method
    /// * `path` - API path, e.g. `/org/` or `/item/app/789/filter/`
    /// * `params` - Query (GET) or body (POST) parameters as a JSON object
    ///
    /// # Errors
    /// Fails on network errors and non-success statuses. Nothing is retried.
    async fn request(&self, method: Method, path: &str, params: Option<&Value>)
        -> FetcherResult<Value>;

    /// Access token appended to file download links
    fn access_token(&self) -> &str;

    /// Base URL of the API, for endpoints fetched as raw downloads
    fn base_url(&self) -> &str;
}

/// Decode a JSON array response into typed records, keeping each raw record
///
/// The typed half drives the traversal; the raw half is what gets persisted.
pub fn parse_records<T: DeserializeOwned>(response: Value) -> FetcherResult<Vec<(T, Value)>> {
    let Value::Array(records) = response else {
        return Err(FetcherError::InvalidResponse(format!(
            "expected a JSON array, got {}",
            json_kind(&response)
        )));
    };

    records
        .into_iter()
        .map(|raw| {
            let typed = T::deserialize(&raw)
                .map_err(|e| FetcherError::ParseError(format!("{e} in {raw}")))?;
            Ok((typed, raw))
        })
        .collect()
}

/// Decode a JSON array response into opaque records
pub fn expect_array(response: Value) -> FetcherResult<Vec<Value>> {
    match response {
        Value::Array(records) => Ok(records),
        other => Err(FetcherError::InvalidResponse(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
