//! Integration tests for `FeedFetcher` using wiremock HTTP mocks.

use std::fmt::Write as _;
use std::time::Duration;

use briefing_core::FeedSource;
use briefing_feeds::{FeedFetcher, FetcherSettings};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> FetcherSettings {
    FetcherSettings {
        request_timeout: Duration::from_secs(2),
        tier_deadline: Duration::from_secs(2),
        fetch_all_deadline: Duration::from_secs(20),
        inter_fetch_delay: Duration::ZERO,
        proxy_url: None,
        ..FetcherSettings::default()
    }
}

fn fetcher(settings: FetcherSettings) -> FeedFetcher {
    FeedFetcher::new(settings).expect("client construction should not fail")
}

fn source(url: String, name: &str) -> FeedSource {
    FeedSource {
        url,
        display_name: name.to_string(),
        category: "economy".to_string(),
    }
}

fn rss(items: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Test Feed</title><description>Test</description>"#,
    );
    for i in 0..items {
        let _ = write!(
            xml,
            "<item><title>Story {i}</title><link>https://news.example.com/{i}</link>\
             <pubDate>Mon, 06 Jan 2025 09:{i:02}:00 GMT</pubDate>\
             <description>Body of story {i}</description></item>"
        );
    }
    xml.push_str("</channel></rss>");
    xml
}

fn rss_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/rss+xml")
        .set_body_string(body)
}

#[tokio::test]
async fn fetch_returns_items_from_valid_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(rss_response(rss(3)))
        .mount(&server)
        .await;

    let feed = fetcher(settings())
        .fetch(&source(format!("{}/feed", server.uri()), "Example"))
        .await;

    assert_eq!(feed.items.len(), 3);
    assert_eq!(feed.title, "Test Feed");
    assert_eq!(feed.source_name, "Example");
    assert_eq!(feed.category.as_deref(), Some("economy"));
    assert_eq!(feed.items[0].title.as_deref(), Some("Story 0"));
    assert_eq!(
        feed.items[0].link.as_deref(),
        Some("https://news.example.com/0")
    );
}

#[tokio::test]
async fn fetch_caps_items_at_six() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(rss_response(rss(10)))
        .mount(&server)
        .await;

    let feed = fetcher(settings())
        .fetch(&source(format!("{}/feed", server.uri()), "Example"))
        .await;

    assert_eq!(feed.items.len(), 6);
    assert_eq!(feed.items[5].title.as_deref(), Some("Story 5"));
}

#[tokio::test]
async fn missing_fields_get_defaults() {
    let server = MockServer::start().await;
    let body = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Sparse</title>
        <item><description>No title, link or date</description></item>
        </channel></rss>"#;
    Mock::given(method("GET"))
        .and(path("/sparse"))
        .respond_with(rss_response(body.to_string()))
        .mount(&server)
        .await;

    let url = format!("{}/sparse", server.uri());
    let before = chrono::Utc::now();
    let feed = fetcher(settings()).fetch(&source(url.clone(), "Sparse")).await;

    assert_eq!(feed.items.len(), 1);
    let item = &feed.items[0];
    assert_eq!(item.title.as_deref(), Some("Untitled"));
    assert_eq!(item.link.as_deref(), Some(url.as_str()));
    let published = item.published_at.expect("date defaulted");
    assert!(published >= before);
}

#[tokio::test]
async fn unreachable_source_degrades_without_items() {
    let feed = fetcher(settings())
        .fetch(&source("http://127.0.0.1:1/feed".to_string(), "Offline"))
        .await;

    assert!(feed.items.is_empty());
    assert_eq!(feed.title, "Offline");
    assert!(feed.description.contains("127.0.0.1:1/feed"));
}

#[tokio::test]
async fn non_feed_body_degrades_with_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Not a feed</body></html>"))
        .mount(&server)
        .await;

    let feed = fetcher(settings())
        .fetch(&source(format!("{}/page", server.uri()), "Broken"))
        .await;

    assert!(feed.items.is_empty());
    assert!(feed.description.starts_with("Failed to parse feed"));
}

#[tokio::test]
async fn bare_ampersands_recover_through_lenient_tier() {
    let server = MockServer::start().await;
    let body = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Tax & NI</title>
        <item><title>Tax & NI thresholds frozen</title><link>https://news.example.com/a?x=1&y=2</link>
        <description>Income tax & national insurance</description></item>
        <item><title>Second</title><link>https://news.example.com/b</link></item>
        </channel></rss>"#;
    Mock::given(method("GET"))
        .and(path("/amp"))
        .respond_with(rss_response(body.to_string()))
        .mount(&server)
        .await;

    let feed = fetcher(settings())
        .fetch(&source(format!("{}/amp", server.uri()), "Amp"))
        .await;

    assert_eq!(feed.items.len(), 2);
    assert!(feed.items[0]
        .title
        .as_deref()
        .is_some_and(|t| t.starts_with("Tax")));
}

#[tokio::test]
async fn server_error_falls_back_to_proxy() {
    let origin = MockServer::start().await;
    let proxy = MockServer::start().await;
    let feed_url = format!("{}/feed", origin.uri());

    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw"))
        .and(query_param("url", feed_url.as_str()))
        .respond_with(rss_response(rss(2)))
        .expect(1)
        .mount(&proxy)
        .await;

    let feed = fetcher(FetcherSettings {
        proxy_url: Some(format!("{}/raw?url=", proxy.uri())),
        ..settings()
    })
    .fetch(&source(feed_url, "Proxied"))
    .await;

    assert_eq!(feed.items.len(), 2);
}

#[tokio::test]
async fn proxy_failure_reports_unable_to_fetch() {
    let origin = MockServer::start().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&proxy)
        .await;

    let feed_url = format!("{}/feed", origin.uri());
    let feed = fetcher(FetcherSettings {
        proxy_url: Some(format!("{}/raw?url=", proxy.uri())),
        ..settings()
    })
    .fetch(&source(feed_url.clone(), "Down"))
    .await;

    assert!(feed.items.is_empty());
    assert_eq!(feed.description, format!("Unable to fetch feed from {feed_url}"));
}

#[tokio::test]
async fn slow_source_times_out_while_others_succeed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(rss_response(rss(4)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(rss_response(rss(4)).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(rss_response(rss(4)))
        .mount(&server)
        .await;

    let sources = vec![
        source(format!("{}/a", server.uri()), "A"),
        source(format!("{}/slow", server.uri()), "Slow"),
        source(format!("{}/b", server.uri()), "B"),
    ];
    let feeds = fetcher(FetcherSettings {
        request_timeout: Duration::from_secs(10),
        tier_deadline: Duration::from_millis(500),
        ..settings()
    })
    .fetch_all(&sources)
    .await;

    assert_eq!(feeds.len(), 3);
    assert_eq!(feeds[0].items.len(), 4);
    assert!(feeds[1].items.is_empty());
    assert!(feeds[1].description.to_lowercase().contains("timed out"));
    assert_eq!(feeds[2].items.len(), 4);
    assert_eq!(feeds[2].source_name, "B");
}

#[tokio::test]
async fn batch_deadline_pads_unreached_sources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(rss_response(rss(2)).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let sources: Vec<FeedSource> = (0..3)
        .map(|i| source(format!("{}/feed/{i}", server.uri()), &format!("S{i}")))
        .collect();
    let feeds = fetcher(FetcherSettings {
        request_timeout: Duration::from_secs(10),
        tier_deadline: Duration::from_secs(10),
        fetch_all_deadline: Duration::from_millis(300),
        ..settings()
    })
    .fetch_all(&sources)
    .await;

    assert_eq!(feeds.len(), 3);
    for (feed, src) in feeds.iter().zip(&sources) {
        assert_eq!(feed.source_url, src.url);
        assert!(feed.items.is_empty());
        assert!(feed.description.contains("Timed out"));
    }
}
