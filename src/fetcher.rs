//! Feed fetching over HTTP.
//!
//! [`FeedFetcher`] is the seam watchers and source adapters talk to;
//! [`HttpFetcher`] is the `reqwest` implementation with timeouts, a redirect
//! limit and a body size cap.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::config::FetchConfig;
use crate::error::{FeedmergeError, Result};
use crate::feed::{parse_feed, RawFeed};

/// Fetches feeds and plain pages.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse the feed at `url`.
    async fn fetch_feed(&self, url: &str) -> Result<RawFeed>;

    /// Fetch the page at `url` as text.
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

/// HTTP fetcher with resource limits.
pub struct HttpFetcher {
    client: Client,
    max_body_size: u64,
}

impl HttpFetcher {
    /// Create a fetcher from the fetch configuration.
    ///
    /// `config.user_agent` is expected to be filled in already.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FeedmergeError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_body_size: config.max_feed_size_bytes,
        })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        validate_url(url)?;

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedmergeError::Fetch(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedmergeError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_body_size {
                return Err(self.too_large(content_length));
            }
        }

        // Content-Length may be absent or wrong; enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FeedmergeError::Fetch(format!("failed to read response: {}", e)))?
        {
            let size = (body.len() + chunk.len()) as u64;
            if size > self.max_body_size {
                return Err(self.too_large(size));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    fn too_large(&self, size: u64) -> FeedmergeError {
        FeedmergeError::Fetch(format!(
            "response too large: {} bytes (max {} bytes)",
            size, self.max_body_size
        ))
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<RawFeed> {
        let bytes = self.get_bytes(url).await?;
        parse_feed(&bytes, Utc::now())
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let bytes = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Only absolute `http`/`https` URLs are fetched.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedmergeError::Fetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedmergeError::Fetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(FeedmergeError::Fetch("URL has no host".to_string()));
    }

    Ok(())
}
