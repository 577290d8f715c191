//! EACH_LIMIT bounds the item pages and downloads open at once

use crate::support::mock_podio::{numbered, page_of, MockDownloader, MockPodio, APP_ID};
use podio_export::exporter::{ExportConfig, ExportExecutor};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const LATENCY: Duration = Duration::from_millis(5);

#[tokio::test]
async fn test_item_pages_never_exceed_each_limit() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(
        MockPodio::with_items(|params| {
            let items = numbered("item", 10);
            Ok(json!({ "items": page_of(&items, Some(params)), "total": 10 }))
        })
        .with_latency(LATENCY),
    );
    let mut config = ExportConfig::default().with_each_limit(2);
    config.items_limit = 1;

    let summary = ExportExecutor::new(api.clone(), Arc::new(MockDownloader::new()), config, temp.path())
        .export_account("test-account")
        .await
        .unwrap();

    let items_path = format!("/item/app/{APP_ID}/filter/");
    assert_eq!(api.requests_to(&items_path).len(), 10);
    assert_eq!(api.peak_in_flight(&items_path), 2);

    let (_, app) = summary.applications().next().unwrap();
    assert_eq!((app.num_items, app.total_items), (10, 10));
}

#[tokio::test]
async fn test_downloads_never_exceed_each_limit() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(MockPodio::with_files(10));
    let downloader = Arc::new(MockDownloader::new().with_latency(LATENCY));
    let config = ExportConfig::default().with_downloads(true).with_each_limit(2);

    let summary = ExportExecutor::new(api, downloader.clone(), config, temp.path())
        .export_account("test-account")
        .await
        .unwrap();

    assert_eq!(downloader.calls(), 10);
    assert_eq!(downloader.peak_in_flight(), 2);

    let (_, app) = summary.applications().next().unwrap();
    assert_eq!((app.num_files, app.downloaded_files), (10, 10));
}
