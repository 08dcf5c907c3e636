//! Test helpers for pipeline tests.
//!
//! Provides in-memory fetchers and stores plus config and wait helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use feedmerge::feed::{parse_feed, RawFeed, RawItem};
use feedmerge::{Config, FeedmergeError, FeedFetcher, Result, SnapshotStore};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Base instant for item times.
pub fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// A feed with one item per `(id, minutes)` pair.
pub fn feed_of(items: &[(&str, i64)]) -> RawFeed {
    let items = items
        .iter()
        .map(|(id, minutes)| {
            RawItem::new(*id)
                .with_title(format!("Item {id}"))
                .with_link(format!("https://example.com/{id}"))
                .with_published(t(*minutes))
        })
        .collect();
    RawFeed::new(Utc::now()).with_items(items)
}

/// Fetcher serving fixed feeds by URL and counting calls.
#[derive(Default)]
pub struct StaticFetcher {
    feeds: Mutex<HashMap<String, RawFeed>>,
    pub feed_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(self, url: &str, feed: RawFeed) -> Self {
        self.feeds.lock().unwrap().insert(url.to_string(), feed);
        self
    }

    pub fn feed_calls(&self) -> usize {
        self.feed_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for StaticFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<RawFeed> {
        self.feed_calls.fetch_add(1, Ordering::SeqCst);
        self.feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FeedmergeError::Fetch("HTTP error: 404 Not Found".to_string()))
    }

    async fn fetch_page(&self, _url: &str) -> Result<String> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        Err(FeedmergeError::Fetch("HTTP error: 404 Not Found".to_string()))
    }
}

/// Decrements the in-flight counter when the fetch future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fetcher whose fetches never complete.
#[derive(Default)]
pub struct HangingFetcher {
    pub started: AtomicUsize,
    pub in_flight: AtomicUsize,
}

#[async_trait]
impl FeedFetcher for HangingFetcher {
    async fn fetch_feed(&self, _url: &str) -> Result<RawFeed> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);
        std::future::pending().await
    }

    async fn fetch_page(&self, _url: &str) -> Result<String> {
        std::future::pending().await
    }
}

/// In-memory store recording every save.
#[derive(Default)]
pub struct MemoryStore {
    initial: Option<String>,
    saves: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: String) -> Self {
        Self {
            initial: Some(document),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn last_saved(&self) -> Option<String> {
        self.saves.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Option<RawFeed> {
        let document = self.initial.as_ref()?;
        parse_feed(document.as_bytes(), Utc::now()).ok()
    }

    async fn save(&self, rendered: &str) -> Result<()> {
        self.saves.lock().unwrap().push(rendered.to_string());
        Ok(())
    }
}

/// A config listening on an ephemeral port with no stagger.
pub fn test_config(sources: &[&str], max_items: usize) -> Config {
    let mut config = Config::default();
    config.sources = sources.iter().map(|s| s.to_string()).collect();
    config.max_items = max_items;
    config.server.addr = "127.0.0.1:0".to_string();
    config.server.shutdown_timeout_secs = 5;
    config.feed.id = "urn:test".to_string();
    config.feed.title = "Test".to_string();
    config.feed.self_link = "http://127.0.0.1/".to_string();
    config.feed.file = "unused.xml".to_string();
    config.fetch.user_agent = "Test/1.0".to_string();
    config.schedule.initial_pause_secs = 0;
    config.schedule.min_interval_mins = 60;
    config.schedule.max_interval_mins = 60;
    config
}

/// Poll `check` until it returns true or the default timeout elapses.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Ids of the entries in a rendered document, in order.
pub fn entry_ids(document: &str) -> Vec<String> {
    parse_feed(document.as_bytes(), Utc::now())
        .map(|feed| feed.items.into_iter().map(|i| i.id).collect())
        .unwrap_or_default()
}
