//! Configured sources and the per-type adapters behind them.

pub mod http;
pub mod youtube;

use std::fmt;

use chrono::{DateTime, Utc};
use url::Url;

use crate::aggregate::OutputItem;
use crate::feed::RawItem;
use crate::fetcher::FeedFetcher;

/// How a source locator is resolved and how its items are converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAdapter {
    /// Plain RSS/Atom/JSON feed URL.
    Http,
    /// YouTube channel page or channel feed.
    Youtube,
}

impl SourceAdapter {
    /// Pick the adapter for a locator, or `None` if it is not usable.
    pub fn detect(locator: &str) -> Option<Self> {
        let url = Url::parse(locator).ok()?;
        let host = url.host_str()?;

        match url.scheme() {
            "https" if youtube::is_youtube_host(host) => Some(Self::Youtube),
            "http" | "https" => Some(Self::Http),
            _ => None,
        }
    }

    /// Resolve a locator to a fetchable feed URL.
    pub async fn resolve(&self, locator: &str, fetcher: &dyn FeedFetcher) -> Option<String> {
        match self {
            Self::Http => Some(locator.to_string()),
            Self::Youtube => youtube::resolve(locator, fetcher).await,
        }
    }

    /// Convert a raw item, or `None` to skip it.
    pub fn transform(&self, raw: &RawItem, fetched_at: DateTime<Utc>) -> Option<OutputItem> {
        match self {
            Self::Http => http::transform(raw, fetched_at),
            Self::Youtube => youtube::transform(raw, fetched_at),
        }
    }
}

impl fmt::Display for SourceAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Youtube => write!(f, "youtube"),
        }
    }
}

/// One configured source, owned by its watcher.
#[derive(Debug, Clone)]
pub struct Source {
    /// Locator as configured.
    pub locator: String,
    /// Cached feed URL; `None` until resolved.
    pub resolved_url: Option<String>,
    pub adapter: SourceAdapter,
}

impl Source {
    /// Build a source, or `None` if no adapter accepts the locator.
    pub fn new(locator: impl Into<String>) -> Option<Self> {
        let locator = locator.into();
        let adapter = SourceAdapter::detect(&locator)?;
        Some(Self {
            locator,
            resolved_url: None,
            adapter,
        })
    }

    /// The cached feed URL, resolving it first when missing.
    pub async fn feed_url(&mut self, fetcher: &dyn FeedFetcher) -> Option<String> {
        if self.resolved_url.is_none() {
            self.resolved_url = self
                .adapter
                .resolve(&self.locator, fetcher)
                .await
                .filter(|u| !u.is_empty());
        }
        self.resolved_url.clone()
    }

    /// Drop the cached feed URL so the next cycle resolves again.
    pub fn invalidate(&mut self) {
        self.resolved_url = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(
            SourceAdapter::detect("https://example.com/feed.xml"),
            Some(SourceAdapter::Http)
        );
        assert_eq!(
            SourceAdapter::detect("http://example.com/feed.xml"),
            Some(SourceAdapter::Http)
        );
        assert_eq!(
            SourceAdapter::detect("https://www.youtube.com/@someone"),
            Some(SourceAdapter::Youtube)
        );
        assert_eq!(
            SourceAdapter::detect("https://youtube.com/channel/UC1"),
            Some(SourceAdapter::Youtube)
        );
        // plain http youtube is treated as a generic feed
        assert_eq!(
            SourceAdapter::detect("http://www.youtube.com/@someone"),
            Some(SourceAdapter::Http)
        );
        assert_eq!(SourceAdapter::detect("ftp://example.com/feed.xml"), None);
        assert_eq!(SourceAdapter::detect("not a url"), None);
    }

    #[test]
    fn test_source_new() {
        let source = Source::new("https://example.com/feed.xml").unwrap();
        assert_eq!(source.adapter, SourceAdapter::Http);
        assert!(source.resolved_url.is_none());

        assert!(Source::new("mailto:someone@example.com").is_none());
    }

    #[test]
    fn test_adapter_display() {
        assert_eq!(SourceAdapter::Http.to_string(), "http");
        assert_eq!(SourceAdapter::Youtube.to_string(), "youtube");
    }
}
