//! Binary downloads of file attachments and spreadsheets
//!
//! The downloader streams the response body straight to disk so large
//! attachments never sit in memory.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::metrics;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Non-success HTTP status
    #[error("download of {url} failed with status {status}")]
    Http {
        /// Requested URL, without the access token
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Network failure while requesting or streaming
    #[error("network error while downloading {url}: {message}")]
    Network {
        /// Requested URL, without the access token
        url: String,
        /// Underlying error
        message: String,
    },

    /// Filesystem failure
    #[error("writing to {} failed: {source}", path.display())]
    Io {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Streams a remote file to a local path
#[async_trait]
pub trait FileDownloader: Send + Sync {
    /// Download `url` into `destination`, replacing any existing file
    ///
    /// The parent directory of `destination` must already exist.
    async fn download(&self, url: &str, destination: &Path) -> Result<(), DownloadError>;
}

/// Append the access token to a download link
///
/// Podio file links only accept the token as a query parameter.
pub fn authorized_url(link: &str, access_token: &str) -> String {
    let separator = if link.contains('?') { '&' } else { '?' };
    format!("{link}{separator}oauth_token={access_token}")
}

/// Strip the query string so tokens never end up in logs or errors
pub fn redact_url(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// reqwest-backed [`FileDownloader`]
#[derive(Clone)]
pub struct HttpFileDownloader {
    client: Client,
}

impl HttpFileDownloader {
    /// Create a downloader on top of a shared HTTP client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn stream_to_file(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let shown = redact_url(url).to_string();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::Network {
                url: shown.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Http {
                url: shown,
                status: status.as_u16(),
            });
        }

        let io_error = |source| DownloadError::Io {
            path: destination.to_path_buf(),
            source,
        };

        let mut file = File::create(destination).await.map_err(io_error)?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Network {
                url: shown.clone(),
                message: e.to_string(),
            })?;
            file.write_all(&chunk).await.map_err(io_error)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(io_error)?;
        Ok(written)
    }
}

#[async_trait]
impl FileDownloader for HttpFileDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        debug!(url = redact_url(url), destination = %destination.display(), "Downloading");

        let written = match self.stream_to_file(url, destination).await {
            Ok(written) => written,
            Err(e) => {
                metrics::record_download(false);
                return Err(e);
            }
        };

        // A failed stat after a completed write is not worth failing the export for
        match tokio::fs::metadata(destination).await {
            Ok(meta) if meta.len() != written => {
                warn!(
                    destination = %destination.display(),
                    expected = written,
                    actual = meta.len(),
                    "Downloaded file size differs from bytes streamed"
                );
            }
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(destination = %destination.display(), error = %e, "Could not stat downloaded file");
            }
            Err(e) => {
                metrics::record_download(false);
                return Err(DownloadError::Io {
                    path: destination.to_path_buf(),
                    source: e,
                });
            }
        }

        metrics::record_download(true);
        info!("Downloaded {}", destination.display());
        Ok(())
    }
}
