//! Export command implementation

use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::exporter::{ExportConfig, ExportExecutor};
use crate::fetcher::auth::{authenticate, Credentials};
use crate::fetcher::download::HttpFileDownloader;
use crate::fetcher::podio_http::{build_http_client, PodioHttpClient, DEFAULT_API_BASE};
use crate::output::to_pretty_json;

use super::CliError;

/// Maximum concurrency accepted on the command line
const MAX_EACH_LIMIT: usize = 64;

/// Parse and validate an `--each-limit` override
fn parse_each_limit(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("each limit must be at least 1".to_string());
    }
    if value > MAX_EACH_LIMIT {
        return Err(format!("each limit {value} exceeds maximum of {MAX_EACH_LIMIT}"));
    }
    Ok(value)
}

/// Export a Podio account to the local filesystem
#[derive(Debug, Parser)]
#[command(name = "podio-export")]
#[command(about = "Export a Podio account to local JSON files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Export options file (RATE_LIMIT, EACH_LIMIT, SHOULD_DOWNLOAD_FILES, ...)
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Credentials file (CLIENT_ID, CLIENT_SECRET, USERNAME, PASSWORD)
    #[arg(long, default_value = "secrets.json")]
    pub secrets: PathBuf,

    /// Directory the export is written to
    #[arg(long, default_value = "podio-export")]
    pub output: PathBuf,

    /// API base URL
    #[arg(long, env = "PODIO_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Override SHOULD_DOWNLOAD_FILES from the config file
    #[arg(long)]
    pub download_files: Option<bool>,

    /// Override EACH_LIMIT from the config file
    #[arg(long, value_parser = parse_each_limit)]
    pub each_limit: Option<usize>,

    /// Serve Prometheus metrics on this address while exporting
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Resolve the export options: config file, then command line overrides
    pub async fn export_config(&self) -> Result<ExportConfig, CliError> {
        let exists = tokio::fs::try_exists(&self.config).await.unwrap_or(false);
        let mut config = if exists {
            ExportConfig::from_file(&self.config).await?
        } else {
            warn!(
                "Config file {} not found, using defaults",
                self.config.display()
            );
            ExportConfig::default()
        };

        if let Some(enabled) = self.download_files {
            config = config.with_downloads(enabled);
        }
        if let Some(each_limit) = self.each_limit {
            config = config.with_each_limit(each_limit);
        }
        config.validate()?;
        Ok(config)
    }

    /// Run the export
    ///
    /// Prints the summary to stdout. A failed completeness check still
    /// prints the summary before the error is returned.
    pub async fn execute(&self) -> Result<(), CliError> {
        if let Some(addr) = self.metrics_addr {
            crate::metrics::init_metrics(addr)
                .map_err(|e| CliError::ConfigurationError(format!("metrics exporter: {e}")))?;
        }

        let config = self.export_config().await?;
        let credentials = load_credentials(&self.secrets).await?;

        let client = build_http_client()?;
        let token = authenticate(&client, &self.api_base, &credentials).await?;

        let api = Arc::new(PodioHttpClient::new(
            client.clone(),
            self.api_base.as_str(),
            token.access_token,
        ));
        let downloader = Arc::new(HttpFileDownloader::new(client));
        let executor = ExportExecutor::new(api, downloader, config, self.output.clone());

        info!(
            username = %credentials.username,
            output = %self.output.display(),
            "Exporting account"
        );

        match executor.export_account(&credentials.username).await {
            Ok(summary) => {
                print_json(&summary)?;
                Ok(())
            }
            Err(e) => {
                if let Some(summary) = e.summary() {
                    print_json(summary)?;
                }
                Err(e.into())
            }
        }
    }
}

/// Load account credentials from a secrets file
pub async fn load_credentials(path: &Path) -> Result<Credentials, CliError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        CliError::ConfigurationError(format!("Failed to read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&contents).map_err(|e| {
        CliError::ConfigurationError(format!("Failed to parse {}: {e}", path.display()))
    })
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = to_pretty_json(value)?;
    println!("{}", String::from_utf8_lossy(&json));
    Ok(())
}
