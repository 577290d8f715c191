//! Podio HTTP client
//!
//! Thin reqwest wrapper implementing [`PodioApi`]:
//! - OAuth2 header on every request
//! - GET params as query string, POST params as JSON body
//! - Non-success statuses become [`FetcherError::HttpError`]; nothing is retried

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::fetcher::{FetcherError, FetcherResult, Method, PodioApi};
use crate::metrics;

/// Default Podio API base URL
pub const DEFAULT_API_BASE: &str = "https://api.podio.com";

/// HTTP connect timeout (seconds) - time to establish TCP connection
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Build the HTTP client shared by API calls, authentication and downloads
///
/// Only the connect phase is bounded; file downloads can legitimately take
/// longer than any fixed request timeout.
pub fn build_http_client() -> FetcherResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .user_agent(concat!("podio-export/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FetcherError::NetworkError(format!("Failed to build HTTP client: {e}")))
}

/// Convert a JSON object of parameters into query pairs
///
/// Strings are sent verbatim, every other value in its JSON form.
pub fn query_pairs(params: Option<&Value>) -> Vec<(String, String)> {
    let Some(Value::Object(map)) = params else {
        return Vec::new();
    };

    map.iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

/// Authenticated Podio API client
pub struct PodioHttpClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl PodioHttpClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `client` - HTTP client (cheap to clone, pools connections)
    /// * `base_url` - API base URL, e.g. [`DEFAULT_API_BASE`]
    /// * `access_token` - OAuth2 access token
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    fn status_error(status: StatusCode, method: Method, url: &str, body: &str) -> FetcherError {
        FetcherError::HttpError(format!("{method} {url} returned {status}: {body}"))
    }
}

#[async_trait]
impl PodioApi for PodioHttpClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: Option<&Value>,
    ) -> FetcherResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Making API request");

        let empty = Value::Object(serde_json::Map::new());
        let builder = match method {
            Method::Get => self.client.get(&url).query(&query_pairs(params)),
            Method::Post => self.client.post(&url).json(params.unwrap_or(&empty)),
        };

        let started = Instant::now();
        let response = builder
            .header(
                reqwest::header::AUTHORIZATION,
                format!("OAuth2 {}", self.access_token),
            )
            .send()
            .await
            .map_err(|e| {
                metrics::record_api_request(method, 0, started.elapsed());
                FetcherError::NetworkError(format!("{method} {url}: {e}"))
            })?;

        let status = response.status();
        metrics::record_api_request(method, status.as_u16(), started.elapsed());

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Self::status_error(status, method, &url, &body));
        }

        response.json::<Value>().await.map_err(|e| {
            FetcherError::ParseError(format!("Failed to deserialize response of {url}: {e}"))
        })
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
