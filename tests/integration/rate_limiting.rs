//! Rate limiting of API requests and downloads through the executor

use crate::support::mock_podio::{MockDownloader, MockPodio};
use podio_export::exporter::{ExportConfig, ExportExecutor, RateLimiter};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

/// Requests made by the standard hierarchy without downloads:
/// orgs, spaces, apps, items, tasks, files, contacts
const STANDARD_REQUESTS: usize = 7;

#[tokio::test]
async fn test_every_request_takes_a_token() {
    let temp = TempDir::new().unwrap();
    let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(3600)));

    ExportExecutor::new(
        Arc::new(MockPodio::standard()),
        Arc::new(MockDownloader::new()),
        ExportConfig::default(),
        temp.path(),
    )
    .with_rate_limiter(limiter.clone())
    .export_account("test-account")
    .await
    .unwrap();

    assert_eq!(limiter.available(), 100 - STANDARD_REQUESTS);
}

#[tokio::test]
async fn test_downloads_take_tokens_too() {
    let temp = TempDir::new().unwrap();
    let limiter = Arc::new(RateLimiter::new(100, Duration::from_secs(3600)));

    ExportExecutor::new(
        Arc::new(MockPodio::standard()),
        Arc::new(MockDownloader::new()),
        ExportConfig::default().with_downloads(true),
        temp.path(),
    )
    .with_rate_limiter(limiter.clone())
    .export_account("test-account")
    .await
    .unwrap();

    assert_eq!(limiter.available(), 100 - STANDARD_REQUESTS - 2);
}

#[tokio::test(start_paused = true)]
async fn test_export_waits_for_window_when_bucket_is_empty() {
    let temp = TempDir::new().unwrap();
    let window = Duration::from_secs(60);
    let limiter = Arc::new(RateLimiter::new(3, window));
    let started = Instant::now();

    let summary = ExportExecutor::new(
        Arc::new(MockPodio::standard()),
        Arc::new(MockDownloader::new()),
        ExportConfig::default(),
        temp.path(),
    )
    .with_rate_limiter(limiter)
    .export_account("test-account")
    .await
    .unwrap();

    // 7 requests through a bucket of 3 need two refills
    assert!(started.elapsed() >= window * 2);
    assert_eq!(summary.account.num_contacts, 2);
}

#[test]
fn test_limiter_sized_from_config() {
    let mut config = ExportConfig::default();
    config.rate_limit = 250;
    let limiter = RateLimiter::per_hour(config.rate_limit);

    assert_eq!(limiter.capacity(), 250);
    assert_eq!(limiter.window(), Duration::from_secs(3600));
}
