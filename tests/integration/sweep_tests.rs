//! Integration tests for the sweep
//!
//! These tests use wiremock to serve a catalog, a manifest and gzip WARC
//! archives, and drive full sweep passes against a temporary root directory.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use warc_sweep::archive::ArchiveKey;
use warc_sweep::catalog::BatchId;
use warc_sweep::config::{Config, SweepMode};
use warc_sweep::output::StopReason;
use warc_sweep::state::{FsStateStore, StateStore};
use warc_sweep::{run_sweep, SweepError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BATCH: &str = "CC-MAIN-2020-05";

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// One WARC response record holding an HTML body
fn warc_record(uri: &str, html: &str) -> String {
    format!(
        "WARC/1.0\r\nWARC-Type: response\r\nWARC-Target-URI: {}\r\nContent-Type: application/http; msgtype=response\r\n\r\nHTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n{}\r\n\r\n",
        uri, html
    )
}

/// Archive with every record in its own gzip member
fn archive(records: &[(&str, &str)]) -> Vec<u8> {
    let mut data = gzip(b"WARC/1.0\r\nWARC-Type: warcinfo\r\n\r\nsoftware: test\r\n\r\n");
    for (uri, html) in records {
        data.extend(gzip(warc_record(uri, html).as_bytes()));
    }
    data
}

fn archive_path(i: usize) -> String {
    format!(
        "crawl-data/{}/segments/1579250589560.16/warc/CC-MAIN-20200117000000-20200117030000-{:05}.warc.gz",
        BATCH, i
    )
}

fn test_config(server: &MockServer, root: &Path, mode: SweepMode) -> Config {
    let mut config = Config::default();
    config.paths.root = root.to_path_buf();
    config.sweep.archives_per_batch = mode;
    config.http.catalog_url = format!("{}/collinfo.json", server.uri());
    config.http.data_url = format!("{}/", server.uri());
    config.http.initial_backoff_ms = 1;
    config.http.max_backoff_ms = 2;
    config.http.max_attempts = 2;
    config
}

async fn mount_catalog(server: &MockServer, ids: &[&str]) {
    let body = serde_json::to_string(
        &ids.iter()
            .map(|id| serde_json::json!({ "id": id, "name": id }))
            .collect::<Vec<_>>(),
    )
    .unwrap();
    Mock::given(method("GET"))
        .and(path("/collinfo.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_manifest(server: &MockServer, batch: &str, paths: &[String], expected_fetches: u64) {
    let text = paths.join("\n") + "\n";
    Mock::given(method("GET"))
        .and(path(format!("/crawl-data/{}/warc.paths.gz", batch)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gzip(text.as_bytes())))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

async fn mount_archive(server: &MockServer, archive_path: &str, body: Vec<u8>, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", archive_path)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

fn results_dir(root: &Path, archive_path: &str) -> std::path::PathBuf {
    root.join("results")
        .join(BATCH)
        .join(ArchiveKey::from_path(archive_path).as_str())
}

fn read_lines(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

fn state(root: &Path) -> FsStateStore {
    FsStateStore::new(root.join("state")).unwrap()
}

#[tokio::test]
async fn test_single_hit_end_to_end() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let paths = vec![archive_path(0)];
    mount_catalog(&server, &[BATCH]).await;
    mount_manifest(&server, BATCH, &paths, 1).await;
    mount_archive(
        &server,
        &paths[0],
        archive(&[
            (
                "http://site1.test/",
                r#"<html><form id="commentform" method="post"></form></html>"#,
            ),
            ("http://plain.test/", "<html><p>nothing here</p></html>"),
        ]),
        1,
    )
    .await;

    let config = test_config(&server, root.path(), SweepMode::RandomQuota(1));
    let report = run_sweep(config).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::RandomPick);
    assert_eq!(report.archives_succeeded, 1);
    assert_eq!(report.records_scanned, 2);
    assert_eq!(report.hits("wordpress"), 1);
    assert_eq!(report.hits("wix"), 0);

    let dir = results_dir(root.path(), &paths[0]);
    assert_eq!(read_lines(&dir.join("WP-site.txt")), vec!["http://site1.test/"]);
    assert!(read_lines(&dir.join("WIX-site.txt")).is_empty());

    let done = state(root.path()).load_done_set(&BatchId::from(BATCH));
    assert!(done.contains(&ArchiveKey::from_path(&paths[0])));
}

#[tokio::test]
async fn test_domains_deduplicated_within_archive() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let form = r#"<form action="https://x/wp-comments-post.php">"#;
    let paths = vec![archive_path(0)];
    mount_catalog(&server, &[BATCH]).await;
    mount_manifest(&server, BATCH, &paths, 1).await;
    mount_archive(
        &server,
        &paths[0],
        archive(&[
            ("http://WWW.Example.com:8080/x", form),
            ("https://example.com/y", form),
            ("https://other.test/", r#"<meta name="generator" content="Wix.com Website Builder">"#),
        ]),
        1,
    )
    .await;

    let config = test_config(&server, root.path(), SweepMode::RandomQuota(1));
    let report = run_sweep(config).await.unwrap();
    assert_eq!(report.hits("wordpress"), 1);
    assert_eq!(report.hits("wix"), 1);

    let dir = results_dir(root.path(), &paths[0]);
    assert_eq!(
        read_lines(&dir.join("WP-site.txt")),
        vec!["http://WWW.Example.com:8080/x"]
    );
    assert_eq!(read_lines(&dir.join("WIX-site.txt")), vec!["https://other.test/"]);
}

#[tokio::test]
async fn test_sequential_run_resumes_at_cursor() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let paths: Vec<String> = (0..3).map(archive_path).collect();
    mount_catalog(&server, &[BATCH]).await;
    mount_manifest(&server, BATCH, &paths, 1).await;
    for (i, p) in paths.iter().enumerate() {
        let uri = format!("http://site{}.test/", i);
        let body = archive(&[(uri.as_str(), r#"<form class="comment-form">"#)]);
        // Every archive is fetched exactly once across both runs
        mount_archive(&server, p, body, 1).await;
    }

    let mut config = test_config(&server, root.path(), SweepMode::Exhaustive);
    config.sweep.max_files_per_run = Some(2);

    let first = run_sweep(config.clone()).await.unwrap();
    assert_eq!(first.stop_reason, StopReason::FileLimit);
    assert_eq!(first.archives_attempted, 2);

    let batch = BatchId::from(BATCH);
    assert_eq!(state(root.path()).load_cursor(&batch), 2);
    assert_eq!(state(root.path()).load_global_index(), 0);

    let second = run_sweep(config.clone()).await.unwrap();
    assert_eq!(second.stop_reason, StopReason::Completed);
    assert_eq!(second.archives_attempted, 1);
    assert_eq!(state(root.path()).load_cursor(&batch), 3);
    assert_eq!(state(root.path()).load_global_index(), 1);
    assert_eq!(state(root.path()).load_done_set(&batch).len(), 3);

    // Nothing left to do
    let third = run_sweep(config).await.unwrap();
    assert_eq!(third.archives_attempted, 0);
    assert_eq!(third.batches_visited, 0);
}

#[tokio::test]
async fn test_file_limit_at_batch_end_skips_next_manifest() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let next = "CC-MAIN-2020-10";

    let paths = vec![archive_path(0)];
    mount_catalog(&server, &[BATCH, next]).await;
    mount_manifest(&server, BATCH, &paths, 1).await;
    mount_archive(
        &server,
        &paths[0],
        archive(&[("http://site0.test/", r#"<form id="commentform">"#)]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("/crawl-data/{}/warc.paths.gz", next)))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server, root.path(), SweepMode::Exhaustive);
    config.sweep.max_files_per_run = Some(1);

    let report = run_sweep(config).await.unwrap();
    assert_eq!(report.stop_reason, StopReason::FileLimit);
    assert_eq!(report.archives_attempted, 1);
    assert_eq!(report.batches_visited, 1);
    assert_eq!(state(root.path()).load_global_index(), 1);
}

#[tokio::test]
async fn test_sequential_skips_failed_archive() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let paths: Vec<String> = (0..2).map(archive_path).collect();
    mount_catalog(&server, &[BATCH]).await;
    mount_manifest(&server, BATCH, &paths, 1).await;
    Mock::given(method("GET"))
        .and(path(format!("/{}", paths[0])))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_archive(
        &server,
        &paths[1],
        archive(&[("http://ok.test/", r#"<form id='commentform'>"#)]),
        1,
    )
    .await;

    let config = test_config(&server, root.path(), SweepMode::Exhaustive);
    let report = run_sweep(config).await.unwrap();

    assert_eq!(report.archives_attempted, 2);
    assert_eq!(report.archives_failed, 1);
    assert_eq!(report.archives_succeeded, 1);

    let batch = BatchId::from(BATCH);
    let store = state(root.path());
    assert_eq!(store.load_cursor(&batch), 2);
    let done = store.load_done_set(&batch);
    assert!(!done.contains(&ArchiveKey::from_path(&paths[0])));
    assert!(done.contains(&ArchiveKey::from_path(&paths[1])));
}

#[tokio::test]
async fn test_corrupt_archive_counts_as_failure() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let paths = vec![archive_path(0)];
    mount_catalog(&server, &[BATCH]).await;
    mount_manifest(&server, BATCH, &paths, 1).await;
    mount_archive(&server, &paths[0], b"this is not gzip at all".to_vec(), 1).await;

    let config = test_config(&server, root.path(), SweepMode::RandomQuota(1));
    let report = run_sweep(config).await.unwrap();

    assert_eq!(report.stop_reason, StopReason::RandomPick);
    assert_eq!(report.archives_failed, 1);
    assert!(state(root.path())
        .load_done_set(&BatchId::from(BATCH))
        .is_empty());
}

#[tokio::test]
async fn test_random_quota_across_runs() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let paths: Vec<String> = (0..4).map(archive_path).collect();
    mount_catalog(&server, &[BATCH]).await;
    // The manifest is cached after the first run
    mount_manifest(&server, BATCH, &paths, 1).await;
    for p in &paths {
        Mock::given(method("GET"))
            .and(path(format!("/{}", p)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(archive(&[("http://a.test/", "<p>no match</p>")])),
            )
            .mount(&server)
            .await;
    }

    let config = test_config(&server, root.path(), SweepMode::RandomQuota(3));
    let batch = BatchId::from(BATCH);

    for expected in 1..=3 {
        let report = run_sweep(config.clone()).await.unwrap();
        assert_eq!(report.stop_reason, StopReason::RandomPick);
        assert_eq!(report.archives_attempted, 1);
        assert_eq!(state(root.path()).load_done_set(&batch).len(), expected);
    }

    let report = run_sweep(config).await.unwrap();
    assert_eq!(report.stop_reason, StopReason::Completed);
    assert_eq!(report.archives_attempted, 0);
    assert_eq!(state(root.path()).load_done_set(&batch).len(), 3);
    assert!(root
        .path()
        .join("warc_paths_cache")
        .join(format!("{}.paths", BATCH))
        .is_file());
}

#[tokio::test]
async fn test_start_batch_and_batch_limit() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    mount_catalog(&server, &["CC-MAIN-2019-04", BATCH, "CC-MAIN-2021-10"]).await;
    mount_manifest(&server, BATCH, &[], 1).await;

    let mut config = test_config(&server, root.path(), SweepMode::Exhaustive);
    config.sweep.start_batch = Some(BATCH.to_string());
    config.sweep.max_batches_per_run = Some(1);

    let report = run_sweep(config).await.unwrap();

    // The empty batch completes; the limit stops before CC-MAIN-2021-10
    assert_eq!(report.batches_visited, 1);
    assert_eq!(report.stop_reason, StopReason::BatchLimit);
    assert_eq!(state(root.path()).load_global_index(), 1);
}

#[tokio::test]
async fn test_unknown_start_batch_is_fatal() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    mount_catalog(&server, &[BATCH]).await;

    let mut config = test_config(&server, root.path(), SweepMode::Exhaustive);
    config.sweep.start_batch = Some("CC-MAIN-1999-01".to_string());

    let err = run_sweep(config).await.unwrap_err();
    assert!(matches!(err, SweepError::UnknownStartBatch(_)));
}

#[tokio::test]
async fn test_catalog_failure_is_fatal() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/collinfo.json"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(&server, root.path(), SweepMode::RandomQuota(1));
    let err = run_sweep(config).await.unwrap_err();
    assert!(matches!(err, SweepError::CatalogUnavailable { .. }));
}

#[tokio::test]
async fn test_audit_log_written_for_new_hits() {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();

    let paths = vec![archive_path(0)];
    mount_catalog(&server, &[BATCH]).await;
    mount_manifest(&server, BATCH, &paths, 1).await;
    let form = r#"<form id="commentform">"#;
    mount_archive(
        &server,
        &paths[0],
        archive(&[("http://site1.test/a", form), ("http://site1.test/b", form)]),
        1,
    )
    .await;

    let mut config = test_config(&server, root.path(), SweepMode::RandomQuota(1));
    config.audit.enabled = true;
    run_sweep(config).await.unwrap();

    let text = fs::read_to_string(root.path().join("hits.ndjson")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);

    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["crawl"], BATCH);
    assert_eq!(value["uri"], "http://site1.test/a");
    assert_eq!(value["domain"], "site1.test");
    assert_eq!(value["reason"], "id=commentform");
    assert!(value["snippet"].as_str().unwrap().starts_with("HTTP/1.1 200 OK\n"));
}
