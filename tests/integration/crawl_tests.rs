//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run complete
//! crawls against them, checking the results file written to disk.

use link_ripple::config::{Config, FetchBackend};
use link_ripple::crawler::run_crawl;
use link_ripple::output::CrawlStatus;
use link_ripple::RippleError;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration writing into `dir`
fn create_test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = 3;
    config.crawler.max_workers = 3;
    config.retry.max_retries = 2;
    config.retry.initial_timeout_ms = 2000;
    config.retry.max_timeout_ms = 4000;
    config.retry.min_delay_ms = 0;
    config.retry.max_delay_ms = 0;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.output.results_path = dir.join("broken_links.txt").display().to_string();
    config
}

fn html(links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">link</a>\n", href))
        .collect();
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", anchors))
        .insert_header("content-type", "text/html")
}

/// Mounts a page for both GET and HEAD
async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, route: &str, http_method: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route && r.method.to_string() == http_method)
        .count()
}

fn read_results(config: &Config) -> Vec<String> {
    std::fs::read_to_string(&config.output.results_path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_full_crawl_reports_broken_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount(&server, "/", html(&["/ok", "/missing", "/ok#section"])).await;
    mount(&server, "/ok", html(&["/deep", "/gone"])).await;
    mount(&server, "/deep", html(&[])).await;
    mount(&server, "/missing", ResponseTemplate::new(404)).await;
    mount(&server, "/gone", ResponseTemplate::new(410)).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.output.summary_path = Some(dir.path().join("summary.md").display().to_string());

    let summary = run_crawl(
        &config,
        &format!("{}/", base),
        "test-hash",
        CancellationToken::new(),
    )
    .await
    .expect("crawl should start");

    let mut lines = read_results(&config);
    lines.sort();
    assert_eq!(
        lines,
        vec![
            format!("{}/\t{}/missing\t404", base, base),
            format!("{}/ok\t{}/gone\t410", base, base),
        ]
    );

    assert_eq!(summary.status, CrawlStatus::Completed);
    assert_eq!(summary.stats.pages_crawled, 3);
    assert_eq!(summary.stats.links_broken, 2);
    assert_eq!(summary.config_hash, "test-hash");

    let markdown = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(markdown.contains("| Broken | 2 |"));
    assert!(markdown.contains("test-hash"));

    // Pages are downloaded once, error targets never are
    assert_eq!(requests_to(&server, "/ok", "GET").await, 1);
    assert_eq!(requests_to(&server, "/missing", "GET").await, 0);
}

#[tokio::test]
async fn test_depth_limit_stops_descent() {
    let server = MockServer::start().await;

    mount(&server, "/", html(&["/level1"])).await;
    mount(&server, "/level1", html(&["/level2"])).await;
    mount(&server, "/level2", html(&["/level3"])).await;
    mount(&server, "/level3", html(&[])).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.max_depth = 1;

    let summary = run_crawl(
        &config,
        &format!("{}/", server.uri()),
        "",
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.stats.pages_crawled, 2);
    assert_eq!(requests_to(&server, "/level2", "HEAD").await, 1);
    assert_eq!(requests_to(&server, "/level2", "GET").await, 0);
    assert_eq!(requests_to(&server, "/level3", "HEAD").await, 0);
    assert!(read_results(&config).is_empty());
}

#[tokio::test]
async fn test_timeouts_are_retried_then_reported() {
    let server = MockServer::start().await;

    mount(&server, "/", html(&["/slow"])).await;
    mount(
        &server,
        "/slow",
        ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(1500)),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.retry.initial_timeout_ms = 100;
    config.retry.max_timeout_ms = 200;

    run_crawl(
        &config,
        &format!("{}/", server.uri()),
        "",
        CancellationToken::new(),
    )
    .await
    .unwrap();

    let lines = read_results(&config);
    assert_eq!(lines.len(), 1);
    let fields: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(fields[1], format!("{}/slow", server.uri()));
    assert!(fields[2].starts_with("request timed out"), "got {}", fields[2]);

    assert_eq!(requests_to(&server, "/slow", "HEAD").await, 2);
}

#[tokio::test]
async fn test_head_rejected_falls_back_to_get() {
    let server = MockServer::start().await;

    mount(&server, "/", html(&["/no-head"])).await;
    Mock::given(wiremock::matchers::method("HEAD"))
        .and(path("/no-head"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(wiremock::matchers::method("GET"))
        .and(path("/no-head"))
        .respond_with(html(&[]))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.max_depth = 0;

    let summary = run_crawl(
        &config,
        &format!("{}/", server.uri()),
        "",
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.stats.links_ok, 1);
    assert!(read_results(&config).is_empty());
}

#[tokio::test]
async fn test_malformed_seed_is_a_startup_error() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());

    let result = run_crawl(&config, "not a url", "", CancellationToken::new()).await;
    assert!(matches!(result, Err(RippleError::UrlError(_))));
}

#[tokio::test]
async fn test_unwritable_results_file_is_a_startup_error() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.output.results_path = dir
        .path()
        .join("missing-dir")
        .join("out.txt")
        .display()
        .to_string();

    let result = run_crawl(
        &config,
        "http://127.0.0.1:9/",
        "",
        CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(RippleError::Output(_))));
}

#[tokio::test]
async fn test_unavailable_browser_is_a_startup_error() {
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.fetcher.backend = FetchBackend::Browser;
    config.fetcher.chrome_path = "/nonexistent/chromium-for-tests".to_string();

    let result = run_crawl(
        &config,
        "http://127.0.0.1:9/",
        "",
        CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(RippleError::Startup(_))));
}

#[tokio::test]
async fn test_cancelled_crawl_still_returns_summary() {
    let server = MockServer::start().await;
    mount(&server, "/", html(&["/a"])).await;
    mount(&server, "/a", html(&[])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = run_crawl(&config, &format!("{}/", server.uri()), "", cancel)
        .await
        .unwrap();

    assert_eq!(summary.status, CrawlStatus::Cancelled);
    assert!(Path::new(&config.output.results_path).exists());
}
