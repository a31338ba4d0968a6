//! Integration tests for bookmark discovery and repeated scans.

mod common;

use std::sync::Arc;

use common::{bookmark_json, bookmark_url, media_asset_json, page_json, FakeDownloader};
use linkding_media_archiver::config::Config;
use linkding_media_archiver::linkding::Client;
use linkding_media_archiver::scan::{discover, QueryFilter, Scanner};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Client {
    Client::new(&server.uri(), "secret-token").expect("Failed to create client")
}

#[tokio::test]
async fn test_discover_unions_tags_without_duplicates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .and(query_param("q", "#video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![bookmark_json(1), bookmark_json(2)],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .and(query_param("q", "#music"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(
            vec![bookmark_json(2), bookmark_json(3)],
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let filter = QueryFilter {
        tags: vec!["video".to_string(), "music".to_string()],
        ..QueryFilter::default()
    };
    let bookmarks = discover(&client(&server), &filter).await.unwrap();

    let ids: Vec<_> = bookmarks.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_discover_without_tags_lists_everything() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .and(query_param_is_missing("q"))
        .and(query_param("bundle", "4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(vec![bookmark_json(9)], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let filter = QueryFilter {
        bundle_id: Some(4),
        ..QueryFilter::default()
    };
    let bookmarks = discover(&client(&server), &filter).await.unwrap();
    assert_eq!(bookmarks.len(), 1);
}

#[tokio::test]
async fn test_discover_fails_if_any_tag_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .and(query_param("q", "#video"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(vec![bookmark_json(1)], None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .and(query_param("q", "#music"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let filter = QueryFilter {
        tags: vec!["video".to_string(), "music".to_string()],
        ..QueryFilter::default()
    };
    assert!(discover(&client(&server), &filter).await.is_err());
}

#[tokio::test]
async fn test_second_scan_is_incremental() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![], None)))
        .expect(2)
        .mount(&server)
        .await;

    let config = Config::for_testing();
    let mut scanner = Scanner::new(
        client(&server),
        Arc::new(FakeDownloader::new()),
        config.scan_config(),
    );
    assert!(scanner.watermark().is_none());

    scanner.scan_once().await.unwrap();
    let watermark = scanner.watermark().expect("watermark after first scan");
    scanner.scan_once().await.unwrap();
    assert!(scanner.watermark().unwrap() >= watermark);

    let requests = server.received_requests().await.unwrap();
    let since = |i: usize| {
        requests[i]
            .url
            .query_pairs()
            .find(|(k, _)| k == "modified_since")
            .map(|(_, v)| v.into_owned())
    };
    assert_eq!(since(0), None);
    assert_eq!(
        since(1),
        Some(watermark.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    );
}

#[tokio::test]
async fn test_failed_discovery_keeps_watermark() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let downloader = Arc::new(FakeDownloader::new());
    let mut scanner = Scanner::new(
        client(&server),
        downloader.clone(),
        Config::for_testing().scan_config(),
    );

    assert!(scanner.scan_once().await.is_err());
    assert!(scanner.watermark().is_none());
    assert_eq!(downloader.calls(), 0);
}

#[tokio::test]
async fn test_rescan_after_upload_is_idempotent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/bookmarks/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(vec![bookmark_json(1)], None)),
        )
        .mount(&server)
        .await;
    // First listing has no assets; once uploaded, linkding reports the media asset.
    Mock::given(method("GET"))
        .and(path("/api/bookmarks/1/assets/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![], None)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/bookmarks/1/assets/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(vec![media_asset_json(101)], None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/bookmarks/1/assets/upload/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(media_asset_json(101)))
        .expect(1)
        .mount(&server)
        .await;

    let downloader =
        Arc::new(FakeDownloader::new().with_files(&bookmark_url(1), &["clip.mp4"]));
    let mut scanner = Scanner::new(
        client(&server),
        downloader.clone(),
        Config::for_testing().scan_config(),
    );

    let first = scanner.scan_once().await.unwrap();
    let second = scanner.scan_once().await.unwrap();

    assert_eq!((first.succeeded, first.failed), (1, 0));
    assert_eq!((second.succeeded, second.failed), (1, 0));
    assert_eq!(downloader.calls(), 1);
}
