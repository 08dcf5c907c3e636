//! Wire feed parsing (RSS, Atom, JSON Feed) via `feed-rs`.

use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, Link};
use feed_rs::parser;

use crate::error::{FeedmergeError, Result};
use crate::feed::types::{RawAuthor, RawFeed, RawItem, RawMedia};

/// Parse feed bytes into a [`RawFeed`].
///
/// Used both for fetched source documents and for the persisted snapshot.
/// Entries without an id keep it empty; source adapters derive one.
pub fn parse_feed(bytes: &[u8], fetched_at: DateTime<Utc>) -> Result<RawFeed> {
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)
        .map_err(|e| FeedmergeError::Parse(format!("failed to parse feed: {}", e)))?;

    let items = feed.entries.into_iter().map(convert_entry).collect();

    Ok(RawFeed {
        title: feed.title.map(|t| t.content),
        updated: feed.updated,
        fetched_at,
        items,
    })
}

fn convert_entry(entry: Entry) -> RawItem {
    let link = primary_link(&entry.links).map(|l| l.href.clone());
    let title = entry.title.map(|t| t.content).and_then(non_empty);
    let description = entry.summary.map(|t| t.content).and_then(non_empty);
    let content = entry.content.and_then(|c| c.body).and_then(non_empty);
    let authors = entry
        .authors
        .into_iter()
        .map(|p| RawAuthor {
            name: p.name,
            email: p.email.and_then(non_empty),
        })
        .collect();

    let media = entry.media.into_iter().next().map(|m| RawMedia {
        thumbnail_url: m.thumbnails.into_iter().next().map(|t| t.image.uri),
        description: m.description.map(|d| d.content).and_then(non_empty),
    });

    RawItem {
        id: entry.id,
        title,
        link,
        description,
        content,
        authors,
        published: entry.published.or(entry.updated),
        media,
    }
}

/// The `alternate` link if there is one, else the first link.
fn primary_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
        .or_else(|| links.first())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
