//! YouTube channel sources.
//!
//! The locator is a channel page (`/@handle`, `/channel/<id>`, `/c/<name>`)
//! or the channel's video feed itself. Pages are resolved through the RSS
//! `<link rel="alternate">` they embed; `/channel/<id>` pages map straight to
//! the `feeds/videos.xml` template.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::aggregate::OutputItem;
use crate::feed::RawItem;
use crate::fetcher::FeedFetcher;
use crate::source::http::{first_author, item_id};

const VIDEOS_FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml";

static RSS_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<link rel="alternate" type="application/rss\+xml" title="RSS" href="([^"]+)">"#)
        .expect("rss link regex")
});

/// Whether the host is `youtube.com` or one of its subdomains.
pub fn is_youtube_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "youtube.com" || host.ends_with(".youtube.com")
}

/// Resolve a channel locator to its video feed URL.
pub async fn resolve(locator: &str, fetcher: &dyn FeedFetcher) -> Option<String> {
    let url = Url::parse(locator).ok()?;

    if url.path().starts_with("/feeds/videos.xml") {
        return Some(locator.to_string());
    }

    if let Some(channel_id) = channel_id(&url) {
        return Some(format!("{}?channel_id={}", VIDEOS_FEED_URL, channel_id));
    }

    let page = match fetcher.fetch_page(locator).await {
        Ok(page) => page,
        Err(e) => {
            warn!(source = %locator, error = %e, "Failed to fetch channel page");
            return None;
        }
    };

    let found = find_feed_link(&page);
    if found.is_none() {
        debug!(source = %locator, "No RSS link on channel page");
    }
    found
}

/// `<id>` of a `/channel/<id>` path.
fn channel_id(url: &Url) -> Option<&str> {
    let mut segments = url.path_segments()?;
    match (segments.next(), segments.next()) {
        (Some("channel"), Some(id)) if !id.is_empty() => Some(id),
        _ => None,
    }
}

fn find_feed_link(page: &str) -> Option<String> {
    RSS_LINK
        .captures(page)
        .and_then(|c| c.get(1))
        .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
}

/// Convert a video entry; entries without thumbnail or media description
/// are skipped.
pub fn transform(raw: &RawItem, fetched_at: DateTime<Utc>) -> Option<OutputItem> {
    let link = raw.link.as_deref().filter(|l| !l.is_empty())?;

    let Some(media) = &raw.media else {
        warn!(item = %raw.id, "Video entry has no media group, skipping");
        return None;
    };
    let Some(thumbnail) = media.thumbnail_url.as_deref() else {
        warn!(item = %raw.id, "Video entry has no thumbnail, skipping");
        return None;
    };
    let Some(description) = media.description.as_deref() else {
        warn!(item = %raw.id, "Video entry has no media description, skipping");
        return None;
    };

    let body = video_body(link, thumbnail, description);

    Some(OutputItem {
        id: item_id(raw, link),
        title: raw.title.clone().unwrap_or_default(),
        link: link.to_string(),
        description: body.clone(),
        content: body,
        author: first_author(raw),
        created_at: raw.published.unwrap_or(fetched_at),
    })
}

fn video_body(link: &str, thumbnail: &str, description: &str) -> String {
    format!(
        r#"<p><a href="{}" target="_blank" rel="referrer"><img src="{}" /></a></p><p>{}</p>"#,
        html_escape::encode_double_quoted_attribute(link),
        html_escape::encode_double_quoted_attribute(thumbnail),
        html_escape::encode_text(description).replace('\n', "<br/>"),
    )
}
