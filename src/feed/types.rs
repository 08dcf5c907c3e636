//! Normalized feed types produced by the parser.

use chrono::{DateTime, Utc};

/// Result of one fetch of a source feed.
#[derive(Debug, Clone)]
pub struct RawFeed {
    /// Feed title.
    pub title: Option<String>,
    /// Feed-level update time.
    pub updated: Option<DateTime<Utc>>,
    /// When the document was fetched (or loaded from disk).
    pub fetched_at: DateTime<Utc>,
    /// Items in document order.
    pub items: Vec<RawItem>,
}

impl RawFeed {
    /// Create an empty feed fetched at the given instant.
    pub fn new(fetched_at: DateTime<Utc>) -> Self {
        Self {
            title: None,
            updated: None,
            fetched_at,
            items: Vec::new(),
        }
    }

    /// Set the items.
    pub fn with_items(mut self, items: Vec<RawItem>) -> Self {
        self.items = items;
        self
    }
}

/// Author of a source item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAuthor {
    pub name: String,
    pub email: Option<String>,
}

/// Media extension data (`media:group` and friends).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMedia {
    /// URL of the first thumbnail.
    pub thumbnail_url: Option<String>,
    /// Media description text.
    pub description: Option<String>,
}

/// One item of a source feed, before any adapter has looked at it.
#[derive(Debug, Clone)]
pub struct RawItem {
    /// Guid or entry id; empty when the document carries none.
    pub id: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub authors: Vec<RawAuthor>,
    /// Published time, falling back to the updated time.
    pub published: Option<DateTime<Utc>>,
    pub media: Option<RawMedia>,
}

impl RawItem {
    /// Create an item with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            link: None,
            description: None,
            content: None,
            authors: Vec::new(),
            published: None,
            media: None,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Add an author.
    pub fn with_author(mut self, name: impl Into<String>, email: Option<&str>) -> Self {
        self.authors.push(RawAuthor {
            name: name.into(),
            email: email.map(str::to_string),
        });
        self
    }

    /// Set the published time.
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Set the media extension data.
    pub fn with_media(mut self, media: RawMedia) -> Self {
        self.media = Some(media);
        self
    }
}
