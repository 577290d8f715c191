//! Item, task and file paging through the executor

use crate::support::mock_podio::{numbered, page_of, param, MockDownloader, MockPodio, APP_ID};
use podio_export::exporter::{ExportConfig, ExportExecutor};
use podio_export::ExportError;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn items_path() -> String {
    format!("/item/app/{APP_ID}/filter/")
}

#[tokio::test]
async fn test_one_more_than_limit_makes_two_pages() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(MockPodio::with_items(|params| {
        let items = numbered("item", 3);
        Ok(json!({ "items": page_of(&items, Some(params)), "total": 3 }))
    }));
    let mut config = ExportConfig::default();
    config.items_limit = 2;

    let summary = ExportExecutor::new(api.clone(), Arc::new(MockDownloader::new()), config, temp.path())
        .export_account("test-account")
        .await
        .unwrap();

    let requests = api.requests_to(&items_path());
    let mut offsets: Vec<u64> = requests.iter().map(|r| r.offset()).collect();
    offsets.sort_unstable();
    assert_eq!(offsets, vec![0, 2]);

    let app_dir = temp.path().join("test-account/myOrg/myWorkspace/myApp");
    assert!(app_dir.join("items_1-2.json").exists());
    assert!(app_dir.join("items_3-3.json").exists());

    let (_, app) = summary.applications().next().unwrap();
    assert_eq!(app.num_items, 3);
    assert_eq!(app.total_items, 3);
}

#[tokio::test]
async fn test_changing_total_aborts_without_further_requests() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(MockPodio::with_items(|params| {
        let offset = param(Some(params), "offset");
        let total = if offset == 0 { 5 } else { 6 };
        Ok(json!({ "items": [{ "item": offset + 1 }], "total": total }))
    }));
    let mut config = ExportConfig::default().with_each_limit(1);
    config.items_limit = 1;

    let result = ExportExecutor::new(api.clone(), Arc::new(MockDownloader::new()), config, temp.path())
        .export_account("test-account")
        .await;

    match result {
        Err(ExportError::Consistency(message)) => assert_eq!(
            message,
            "Items might have been created/deleted while exporting. Aborting!"
        ),
        other => panic!("expected consistency error, got {other:?}"),
    }

    assert_eq!(api.requests_to(&items_path()).len(), 2);

    let app_dir = temp.path().join("test-account/myOrg/myWorkspace/myApp");
    assert!(app_dir.join("items_1-1.json").exists());
    assert!(!app_dir.join("items_2-2.json").exists());
}

#[tokio::test]
async fn test_first_page_larger_than_total_is_rejected() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(MockPodio::with_items(|_| {
        Ok(json!({ "items": [{ "item": 1 }, { "item": 2 }], "total": 1 }))
    }));

    let result = ExportExecutor::new(
        api,
        Arc::new(MockDownloader::new()),
        ExportConfig::default(),
        temp.path(),
    )
    .export_account("test-account")
    .await;

    assert!(matches!(result, Err(ExportError::Consistency(_))));
}

#[tokio::test]
async fn test_empty_app_writes_no_item_page() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(MockPodio::with_items(|_| Ok(json!({ "items": [], "total": 0 }))));

    let summary = ExportExecutor::new(
        api.clone(),
        Arc::new(MockDownloader::new()),
        ExportConfig::default(),
        temp.path(),
    )
    .export_account("test-account")
    .await
    .unwrap();

    let (_, app) = summary.applications().next().unwrap();
    assert_eq!((app.num_items, app.total_items), (0, 0));
    assert_eq!(api.requests_to(&items_path()).len(), 1);

    let app_dir = temp.path().join("test-account/myOrg/myWorkspace/myApp");
    let item_pages = std::fs::read_dir(&app_dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("items_"))
        .count();
    assert_eq!(item_pages, 0);
}

#[tokio::test]
async fn test_tasks_page_until_short_page() {
    let temp = TempDir::new().unwrap();
    let api = Arc::new(MockPodio::standard());
    let mut config = ExportConfig::default();
    config.tasks_limit = 1;
    config.files_limit = 2;

    let summary = ExportExecutor::new(api.clone(), Arc::new(MockDownloader::new()), config, temp.path())
        .export_account("test-account")
        .await
        .unwrap();

    let offsets: Vec<u64> = api.requests_to("/task/").iter().map(|r| r.offset()).collect();
    assert_eq!(offsets, vec![0, 1, 2]);

    let org_dir = temp.path().join("test-account/myOrg");
    assert!(org_dir.join("tasks_1-1.json").exists());
    assert!(org_dir.join("tasks_2-2.json").exists());
    assert_eq!(summary.account.organizations["myOrg"].num_tasks, 2);

    // Two files fill the first page exactly, so an empty second page is requested
    let file_offsets: Vec<u64> = api
        .requests_to(&format!("/file/app/{APP_ID}/"))
        .iter()
        .map(|r| r.offset())
        .collect();
    assert_eq!(file_offsets, vec![0, 2]);
}
