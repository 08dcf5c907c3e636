//! The merged, bounded, deduplicated item collection.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// Author of an output item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// One item of the merged feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputItem {
    /// Dedup key, unique within an aggregate.
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub content: String,
    pub author: Option<Author>,
    /// Source publish time, or the fetch time when the source had none.
    pub created_at: DateTime<Utc>,
}

/// Identity of the output feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedIdentity {
    pub id: String,
    pub title: String,
    pub self_link: String,
}

/// Merged collection owned by the aggregation engine.
///
/// Items are kept newest first, with ties in their original relative order,
/// and never exceed `max_items`.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub identity: FeedIdentity,
    pub updated_at: DateTime<Utc>,
    items: Vec<OutputItem>,
    max_items: usize,
}

impl Aggregate {
    /// Create an empty aggregate.
    pub fn new(identity: FeedIdentity, max_items: usize, updated_at: DateTime<Utc>) -> Self {
        Self {
            identity,
            updated_at,
            items: Vec::new(),
            max_items,
        }
    }

    /// Items, newest first.
    pub fn items(&self) -> &[OutputItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Current ids in order.
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    /// Merge candidates and report whether the ordered id list changed.
    ///
    /// A candidate is appended only if its id is not present yet (also among
    /// earlier candidates of the same call). The collection is then stably
    /// sorted by `created_at` descending and truncated to `max_items`.
    pub fn merge<I>(&mut self, candidates: I) -> bool
    where
        I: IntoIterator<Item = OutputItem>,
    {
        let before = self.ids();

        let mut seen: HashSet<String> = before.iter().cloned().collect();
        for item in candidates {
            if seen.insert(item.id.clone()) {
                self.items.push(item);
            }
        }

        self.items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.items.truncate(self.max_items);

        self.items.len() != before.len()
            || self.items.iter().zip(&before).any(|(item, id)| item.id != *id)
    }

    /// Advance `updated_at` to `now`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}
