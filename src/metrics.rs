//! Export metrics
//!
//! Counters and histograms for API requests, persisted files, downloads and
//! rate limiter waits, recorded through the `metrics` facade. Without an
//! installed recorder every call is a no-op; [`init_metrics`] installs a
//! Prometheus exporter for long running exports that should be observable.

use metrics::{counter, describe_counter, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info};

use crate::fetcher::Method;

/// Address of the installed Prometheus listener, set once
static METRICS_ADDR: OnceCell<SocketAddr> = OnceCell::new();

/// Initialize the metrics system with a Prometheus scrape endpoint
///
/// Idempotent: later calls are ignored once an exporter is installed.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "127.0.0.1:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(existing) = METRICS_ADDR.get() {
        debug!(%existing, "Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "api_requests_total",
        Unit::Count,
        "Total number of Podio API requests"
    );
    describe_histogram!(
        "api_request_duration_seconds",
        Unit::Seconds,
        "Podio API request duration in seconds"
    );
    describe_counter!(
        "exported_files_total",
        Unit::Count,
        "JSON documents written to the export directory"
    );
    describe_counter!(
        "downloads_completed_total",
        Unit::Count,
        "Files downloaded successfully"
    );
    describe_counter!(
        "downloads_failed_total",
        Unit::Count,
        "Failed file downloads"
    );
    describe_histogram!(
        "rate_limit_queue_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for a rate limit token"
    );

    let _ = METRICS_ADDR.set(addr);
    info!("Metrics system initialized on {}", addr);
    Ok(())
}

/// Whether a Prometheus exporter has been installed
pub fn is_initialized() -> bool {
    METRICS_ADDR.get().is_some()
}

/// Record one API request; `status` is 0 for network errors
pub fn record_api_request(method: Method, status: u16, duration: Duration) {
    let status = if status == 0 {
        "network_error".to_string()
    } else {
        status.to_string()
    };

    counter!(
        "api_requests_total",
        "method" => method.to_string(),
        "status" => status,
    )
    .increment(1);

    histogram!(
        "api_request_duration_seconds",
        "method" => method.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record one JSON document written to disk
pub fn record_persisted_file() {
    counter!("exported_files_total").increment(1);
}

/// Record the outcome of one binary download
pub fn record_download(success: bool) {
    if success {
        counter!("downloads_completed_total").increment(1);
    } else {
        counter!("downloads_failed_total").increment(1);
    }
}

/// Record time spent waiting for rate limit tokens
pub fn record_rate_limit_wait(wait: Duration, available: usize) {
    histogram!("rate_limit_queue_wait_seconds").record(wait.as_secs_f64());
    gauge!("rate_limit_permits_available").set(available as f64);

    if wait.as_millis() > 100 {
        debug!(
            wait_ms = wait.as_millis(),
            available = available,
            "Rate limit token acquired after wait"
        );
    }
}
