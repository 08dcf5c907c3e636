//! Generic feed sources: the locator is the feed URL.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::aggregate::{Author, OutputItem};
use crate::feed::RawItem;

/// Convert a raw item, skipping it when it has no link.
pub fn transform(raw: &RawItem, fetched_at: DateTime<Utc>) -> Option<OutputItem> {
    let Some(link) = raw.link.as_deref().filter(|l| !l.is_empty()) else {
        warn!(
            item = %raw.id,
            title = raw.title.as_deref().unwrap_or_default(),
            "Item has no link, skipping"
        );
        return None;
    };

    let description = raw
        .description
        .clone()
        .or_else(|| raw.content.clone())
        .unwrap_or_default();
    let content = raw
        .content
        .clone()
        .or_else(|| raw.description.clone())
        .unwrap_or_default();

    Some(OutputItem {
        id: item_id(raw, link),
        title: raw.title.clone().unwrap_or_default(),
        link: link.to_string(),
        description,
        content,
        author: first_author(raw),
        created_at: raw.published.unwrap_or(fetched_at),
    })
}

/// Guid, else `<published>-<link>`, else the link.
pub(crate) fn item_id(raw: &RawItem, link: &str) -> String {
    if !raw.id.is_empty() {
        return raw.id.clone();
    }
    match raw.published {
        Some(published) => format!("{}-{}", published.format("%Y%m%d-%H%M%S"), link),
        None => link.to_string(),
    }
}

pub(crate) fn first_author(raw: &RawItem) -> Option<Author> {
    raw.authors.first().map(|a| Author {
        name: Some(a.name.clone()).filter(|n| !n.is_empty()),
        email: a.email.clone(),
    })
}
