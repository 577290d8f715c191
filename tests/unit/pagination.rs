//! Unit tests for offset/limit paging

use podio_export::exporter::pagination::{
    page_params, remaining_offsets, Collection, PageTally, PaginationHelper,
};
use serde_json::{json, Map};
use std::path::Path;

#[test]
fn test_page_params_without_base() {
    assert_eq!(
        page_params(&Map::new(), 500, 500),
        json!({ "offset": 500, "limit": 500 })
    );
}

#[test]
fn test_remaining_offsets_one_more_than_limit() {
    assert_eq!(remaining_offsets(500, 501), vec![500]);
}

#[test]
fn test_remaining_offsets_advance_by_limit() {
    let offsets = remaining_offsets(100, 1000);
    assert_eq!(offsets.len(), 9);
    assert!(offsets.windows(2).all(|w| w[1] - w[0] == 100));
    assert_eq!(offsets.last(), Some(&900));
}

#[test]
fn test_collection_params_keep_base() {
    let collection = Collection::new("tasks", "/task/", 2, Path::new("/tmp"))
        .with_param("org", 42)
        .with_param("grouping", "none");

    assert_eq!(
        collection.page_params(4),
        json!({ "org": 42, "grouping": "none", "offset": 4, "limit": 2 })
    );
}

#[tokio::test]
async fn test_paginate_empty_collection() {
    let mut calls = Vec::new();
    let tally = PaginationHelper::paginate(100, |offset| {
        calls.push(offset);
        async { Ok(PageTally::default()) }
    })
    .await
    .unwrap();

    assert_eq!(calls, vec![0]);
    assert_eq!(tally, PageTally::default());
}

#[tokio::test]
async fn test_paginate_sums_downloads() {
    let tally = PaginationHelper::paginate(2, |offset| async move {
        let records = if offset == 0 { 2 } else { 1 };
        Ok(PageTally {
            records,
            downloaded: records,
        })
    })
    .await
    .unwrap();

    assert_eq!(
        tally,
        PageTally {
            records: 3,
            downloaded: 3
        }
    );
}
