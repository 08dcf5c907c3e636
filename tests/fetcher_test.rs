//! Integration tests for HttpFetcher and source resolution using wiremock.

use feedmerge::config::FetchConfig;
use feedmerge::{FeedFetcher, FeedmergeError, HttpFetcher, Source};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Mock Feed</title>
    <link>https://example.com</link>
    <item>
      <title>Hello</title>
      <link>https://example.com/hello</link>
      <guid>hello-1</guid>
    </item>
  </channel>
</rss>"#;

fn fetcher(max_feed_size_bytes: u64) -> HttpFetcher {
    HttpFetcher::new(&FetchConfig {
        user_agent: "FeedMergeTest/1.0".to_string(),
        max_feed_size_bytes,
        ..FetchConfig::default()
    })
    .unwrap()
}

/// Test successful fetch and parse
#[tokio::test]
async fn test_fetch_feed_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .and(header("user-agent", "FeedMergeTest/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = fetcher(1024 * 1024)
        .fetch_feed(&format!("{}/feed.xml", mock_server.uri()))
        .await;

    assert!(result.is_ok(), "Fetch should succeed: {:?}", result.err());
    let feed = result.unwrap();
    assert_eq!(feed.title.as_deref(), Some("Mock Feed"));
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].id, "hello-1");
}

/// Test non-success status is an error
#[tokio::test]
async fn test_fetch_feed_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = fetcher(1024 * 1024)
        .fetch_feed(&format!("{}/missing.xml", mock_server.uri()))
        .await;

    match result {
        Err(FeedmergeError::Fetch(msg)) => assert!(msg.contains("404")),
        other => panic!("Expected fetch error, got {:?}", other),
    }
}

/// Test that a body that is not a feed is a parse error
#[tokio::test]
async fn test_fetch_feed_not_a_feed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("just some text"))
        .mount(&mock_server)
        .await;

    let result = fetcher(1024 * 1024)
        .fetch_feed(&format!("{}/page.html", mock_server.uri()))
        .await;

    assert!(matches!(result, Err(FeedmergeError::Parse(_))));
}

/// Test the body size cap
#[tokio::test]
async fn test_fetch_feed_too_large() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/big.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .mount(&mock_server)
        .await;

    let result = fetcher(64)
        .fetch_feed(&format!("{}/big.xml", mock_server.uri()))
        .await;

    match result {
        Err(FeedmergeError::Fetch(msg)) => assert!(msg.contains("too large")),
        other => panic!("Expected fetch error, got {:?}", other),
    }
}

/// Serve one chunked response without a Content-Length header.
async fn serve_chunked(chunks: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 2048];
        let _ = socket.read(&mut request).await;

        let mut response =
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
                .to_string();
        for chunk in chunks {
            response.push_str(&format!("{:x}\r\n{}\r\n", chunk.len(), chunk));
        }
        response.push_str("0\r\n\r\n");
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    format!("http://{}/feed.xml", addr)
}

/// Test the body size cap when the length is not announced
#[tokio::test]
async fn test_fetch_feed_too_large_without_content_length() {
    let url = serve_chunked(vec!["x".repeat(40), "x".repeat(40)]).await;

    let result = fetcher(64).fetch_feed(&url).await;

    match result {
        Err(FeedmergeError::Fetch(msg)) => assert!(msg.contains("too large"), "{msg}"),
        other => panic!("Expected fetch error, got {:?}", other),
    }
}

/// Test that a chunked body within the cap is read completely
#[tokio::test]
async fn test_fetch_feed_chunked_within_limit() {
    let (head, tail) = RSS.split_at(RSS.len() / 2);
    let url = serve_chunked(vec![head.to_string(), tail.to_string()]).await;

    let feed = fetcher(1024 * 1024).fetch_feed(&url).await.unwrap();

    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].id, "hello-1");
}

/// Test plain page fetch
#[tokio::test]
async fn test_fetch_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/channel"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&mock_server)
        .await;

    let page = fetcher(1024)
        .fetch_page(&format!("{}/channel", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(page, "<html>ok</html>");
}

/// Test that a generic source resolves to its own locator and caches it
#[tokio::test]
async fn test_generic_source_fetch_cycle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .mount(&mock_server)
        .await;

    let locator = format!("{}/feed.xml", mock_server.uri());
    let fetcher = fetcher(1024 * 1024);
    let mut source = Source::new(locator.as_str()).unwrap();

    let url = source.feed_url(&fetcher).await.unwrap();
    assert_eq!(url, locator);
    assert_eq!(source.resolved_url.as_deref(), Some(locator.as_str()));

    let feed = fetcher.fetch_feed(&url).await.unwrap();
    assert_eq!(feed.items.len(), 1);
}
