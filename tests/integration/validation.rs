//! Completeness check at the end of an export

use crate::support::mock_podio::{param, MockDownloader, MockPodio};
use podio_export::exporter::{CompletenessError, ExportConfig, ExportExecutor};
use podio_export::ExportError;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

/// Reports three items but only ever returns two
fn short_items_api() -> MockPodio {
    MockPodio::with_items(|params| {
        let items = if param(Some(params), "offset") == 0 {
            json!([{ "item": 1 }, { "item": 2 }])
        } else {
            json!([])
        };
        Ok(json!({ "items": items, "total": 3 }))
    })
}

#[tokio::test]
async fn test_missing_items_fail_validation() {
    let temp = TempDir::new().unwrap();
    let mut config = ExportConfig::default();
    config.items_limit = 2;

    let err = ExportExecutor::new(
        Arc::new(short_items_api()),
        Arc::new(MockDownloader::new()),
        config,
        temp.path(),
    )
    .export_account("test-account")
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Not all items for application 'myApp' have been exported!"
    );
    assert!(matches!(
        &err,
        ExportError::Validation {
            source: CompletenessError::ItemsIncomplete(_),
            ..
        }
    ));

    let summary = err.summary().unwrap();
    let (name, app) = summary.applications().next().unwrap();
    assert_eq!(name, "myApp");
    assert_eq!((app.num_items, app.total_items), (2, 3));
}

#[tokio::test]
async fn test_summary_written_before_validation() {
    let temp = TempDir::new().unwrap();
    let mut config = ExportConfig::default();
    config.items_limit = 2;

    let result = ExportExecutor::new(
        Arc::new(short_items_api()),
        Arc::new(MockDownloader::new()),
        config,
        temp.path(),
    )
    .export_account("test-account")
    .await;
    assert!(result.is_err());

    let contents = std::fs::read_to_string(temp.path().join("test-account/summary.json")).unwrap();
    let written: Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        written["test-account"]["myOrg"]["myWorkspace"]["myApp"]["numItems"],
        2
    );
    assert_eq!(
        written["test-account"]["myOrg"]["myWorkspace"]["myApp"]["totalItems"],
        3
    );
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_requests() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(MockPodio::standard());
    let mut config = ExportConfig::default();
    config.items_limit = 0;

    let result = ExportExecutor::new(api.clone(), Arc::new(MockDownloader::new()), config, temp.path())
        .export_account("test-account")
        .await;

    assert!(matches!(result, Err(ExportError::Config(_))));
    assert!(api.requests().is_empty());
}
