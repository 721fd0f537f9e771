//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against a temporary database.

use newsfusion::config::{parse_config, Config};
use newsfusion::crawler::{Coordinator, CrawlRequest};
use newsfusion::storage::Storage;
use newsfusion::{ConfigError, FusionError, RunStatus};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Option<Duration> = Some(Duration::from_secs(20));

/// Creates a test configuration with the given extra sections
///
/// Delays are kept at the validation minimum and the autothrottle is off so
/// tests are not slowed by start delays.
fn create_test_config(db: &TempDir, run_timeout_secs: u64, extra: &str) -> Config {
    let toml = format!(
        r#"
[crawler]
max-concurrent-requests = 4
download-delay-ms = 100
max-pages-per-target = 5
request-timeout-secs = 10
run-timeout-secs = {run_timeout_secs}

[crawler.retry]
times = 0

[crawler.autothrottle]
enabled = false

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
database-path = "{db}"

[[layout]]
name = "local-listing"
domains = ["127.0.0.1"]
family = "headline-summary"
item = ["div.story"]
title = [{{ css = "h2 a" }}]
url = [{{ css = "h2 a", attr = "href" }}]
summary = [{{ css = "p.summary" }}]
next-page = [{{ css = "a.next", attr = "href" }}]

{extra}
"#,
        run_timeout_secs = run_timeout_secs,
        db = db.path().join("news.db").display(),
        extra = extra,
    );
    parse_config(&toml).expect("test config should be valid")
}

fn source(name: &str, url: &str) -> String {
    format!("[[source]]\nname = \"{}\"\nurl = \"{}\"\n", name, url)
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(format!("<html><body>{}</body></html>", body), "text/html")
}

fn story(href: &str, title: &str, summary: &str) -> String {
    format!(
        r#"<div class="story"><h2><a href="{}">{}</a></h2><p class="summary">{}</p></div>"#,
        href, title, summary
    )
}

#[tokio::test]
async fn test_full_crawl_with_duplicates_and_robots_denial() {
    let site = MockServer::start().await;
    let blocked = MockServer::start().await;

    // Third item repeats the first headline and summary under another URL
    let listing = [
        story("/a/1", "Monsoon reaches Kerala", "IMD confirms onset"),
        story("/a/2", "Sensex hits record", "Banks lead the rally"),
        story("/a/3", "Monsoon reaches Kerala", "IMD confirms onset"),
    ]
    .concat();
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html(&listing))
        .mount(&site)
        .await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&blocked)
        .await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html(&story("/x", "Never fetched", "Never")))
        .expect(0)
        .mount(&blocked)
        .await;

    let db = TempDir::new().unwrap();
    let sources = [
        source("Local Daily", &format!("{}/news", site.uri())),
        source("Blocked Daily", &format!("{}/news", blocked.uri())),
    ]
    .concat();
    let config = create_test_config(&db, 30, &sources);

    let coordinator = Coordinator::new(config, "test-hash".to_string()).unwrap();
    let handle = coordinator.start_crawl(CrawlRequest::sources()).await.unwrap();
    let report = handle.wait(WAIT).await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.counts.discovered, 3);
    assert_eq!(report.counts.stored, 2);
    assert_eq!(report.counts.duplicates, 1);
    assert_eq!(report.counts.errors, 1);

    let storage = coordinator.storage();
    let store = storage.lock().unwrap();
    assert_eq!(store.count_articles().unwrap(), 2);

    let run = store.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.counts.stored, 2);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_keyword_run_without_sources_completes_empty() {
    let db = TempDir::new().unwrap();
    let config = create_test_config(&db, 30, "");

    let coordinator = Coordinator::new(config, "hash".to_string()).unwrap();
    let handle = coordinator
        .start_crawl(CrawlRequest::sources().with_keyword("election"))
        .await
        .unwrap();

    let report = handle.status();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.counts.discovered, 0);
    assert_eq!(report.counts.stored, 0);
    assert_eq!(report.counts.errors, 0);
}

#[tokio::test]
async fn test_search_feed_without_config_is_rejected() {
    let db = TempDir::new().unwrap();
    let config = create_test_config(&db, 30, "");

    let coordinator = Coordinator::new(config, "hash".to_string()).unwrap();
    let result = coordinator
        .start_crawl(CrawlRequest::search_feed(Some("budget")))
        .await;

    assert!(matches!(
        result,
        Err(FusionError::Config(ConfigError::MissingSearchFeed))
    ));
}

#[tokio::test]
async fn test_search_feed_run_labels_by_publisher() {
    let feed = MockServer::start().await;

    let results = r#"
<article class="result"><h3><a href="/r/1">Monsoon session opens</a></h3><span class="pub">Reuters</span></article>
<article class="result"><h3><a href="/r/2">Monsoon delayed in north</a></h3><span class="pub">Reuters</span></article>
<article class="result"><h3><a href="/r/3">Farmers await monsoon</a></h3></article>
"#;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "monsoon"))
        .respond_with(html(results))
        .expect(1)
        .mount(&feed)
        .await;

    let extra = format!(
        r#"
[[layout]]
name = "local-feed"
family = "title-url"
item = ["article.result"]
title = [{{ css = "h3 a" }}]
url = [{{ css = "h3 a", attr = "href" }}]
publisher = [{{ css = "span.pub" }}]

[search]
search-url = "{uri}/search"
trending-url = "{uri}/"
source-label = "Test Feed"
layout = "local-feed"
"#,
        uri = feed.uri()
    );

    let db = TempDir::new().unwrap();
    let config = create_test_config(&db, 30, &extra);
    let coordinator = Coordinator::new(config, "hash".to_string()).unwrap();

    let report = coordinator
        .start_crawl(CrawlRequest::search_feed(Some("monsoon")).waiting(Duration::from_secs(20)))
        .await
        .unwrap()
        .status();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.counts.stored, 3);

    let storage = coordinator.storage();
    let store = storage.lock().unwrap();
    let labels = store.count_articles_by_label().unwrap();
    assert_eq!(
        labels,
        vec![("Reuters".to_string(), 2), ("Test Feed".to_string(), 1)]
    );

    let stored = store.find_articles_containing("farmers", Some(10)).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].keyword.as_deref(), Some("monsoon"));
    assert_eq!(stored[0].summary, "Farmers await monsoon");
}

#[tokio::test]
async fn test_pagination_follows_next_link_and_stops_on_cycle() {
    let site = MockServer::start().await;

    let page_one = format!(
        "{}<a class=\"next\" href=\"/news/page/2\">Next</a>",
        story("/a/1", "First page story", "One")
    );
    let page_two = format!(
        "{}<a class=\"next\" href=\"/news\">Back to start</a>",
        story("/a/2", "Second page story", "Two")
    );
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html(&page_one))
        .expect(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/page/2"))
        .respond_with(html(&page_two))
        .expect(1)
        .mount(&site)
        .await;

    let db = TempDir::new().unwrap();
    let config = create_test_config(
        &db,
        30,
        &source("Local Daily", &format!("{}/news", site.uri())),
    );
    let coordinator = Coordinator::new(config, "hash".to_string()).unwrap();

    let report = coordinator
        .start_crawl(CrawlRequest::sources())
        .await
        .unwrap()
        .wait(WAIT)
        .await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.counts.discovered, 2);
    assert_eq!(report.counts.stored, 2);
    assert_eq!(report.counts.errors, 0);
}

#[tokio::test]
async fn test_run_timeout_ends_as_timed_out() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html(&story("/a/1", "Late story", "Late")).set_delay(Duration::from_secs(5)))
        .mount(&slow)
        .await;

    let db = TempDir::new().unwrap();
    let config = create_test_config(
        &db,
        1,
        &source("Slow Daily", &format!("{}/news", slow.uri())),
    );
    let coordinator = Coordinator::new(config, "hash".to_string()).unwrap();

    let handle = coordinator.start_crawl(CrawlRequest::sources()).await.unwrap();
    let report = handle.wait(WAIT).await;

    assert_eq!(report.status, RunStatus::TimedOut);
    assert_eq!(report.counts.stored, 0);

    let storage = coordinator.storage();
    let run = storage.lock().unwrap().get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::TimedOut);
}

#[tokio::test]
async fn test_cancel_ends_run_as_timed_out() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html("").set_delay(Duration::from_secs(5)))
        .mount(&slow)
        .await;

    let db = TempDir::new().unwrap();
    let config = create_test_config(
        &db,
        60,
        &source("Slow Daily", &format!("{}/news", slow.uri())),
    );
    let coordinator = Coordinator::new(config, "hash".to_string()).unwrap();

    let handle = coordinator.start_crawl(CrawlRequest::sources()).await.unwrap();
    assert_eq!(handle.status().status, RunStatus::Running);

    handle.cancel();
    let report = handle.wait(WAIT).await;
    assert_eq!(report.status, RunStatus::TimedOut);
}

#[tokio::test]
async fn test_second_run_stores_nothing_new() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html(&story("/a/1", "Only story", "Only summary")))
        .mount(&site)
        .await;

    let db = TempDir::new().unwrap();
    let config = create_test_config(
        &db,
        30,
        &source("Local Daily", &format!("{}/news", site.uri())),
    );
    let coordinator = Coordinator::new(config, "hash".to_string()).unwrap();

    let first = coordinator
        .start_crawl(CrawlRequest::sources())
        .await
        .unwrap()
        .wait(WAIT)
        .await;
    let second = coordinator
        .start_crawl(CrawlRequest::sources())
        .await
        .unwrap()
        .wait(WAIT)
        .await;

    assert_eq!(first.counts.stored, 1);
    assert_eq!(second.counts.stored, 0);
    assert_eq!(second.counts.duplicates, 1);
    assert_ne!(first.run_id, second.run_id);
}
