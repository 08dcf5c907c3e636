//! Aggregation engine, the single writer of the merged feed.
//!
//! Watchers send [`EngineMessage`]s over one shared channel. The engine merges
//! every observed feed into its [`Aggregate`]; whenever the ordered id list
//! changes it renders a new snapshot, publishes it and persists it.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::aggregate::{Aggregate, FeedIdentity};
use crate::error::Result;
use crate::feed::{render_atom, RawFeed};
use crate::source::SourceAdapter;
use crate::store::SnapshotStore;
use crate::web::Snapshot;

/// A feed observed by a watcher.
#[derive(Debug)]
pub struct FeedEvent {
    pub locator: String,
    pub adapter: SourceAdapter,
    pub feed: RawFeed,
}

/// Messages accepted by the engine.
#[derive(Debug)]
pub enum EngineMessage {
    Feed(FeedEvent),
    /// Stop after the messages queued before it.
    Terminate,
}

pub struct AggregationEngine {
    aggregate: Aggregate,
    store: Arc<dyn SnapshotStore>,
    events: mpsc::Receiver<EngineMessage>,
    publish: mpsc::Sender<Snapshot>,
}

impl AggregationEngine {
    pub fn new(
        identity: FeedIdentity,
        max_items: usize,
        store: Arc<dyn SnapshotStore>,
        events: mpsc::Receiver<EngineMessage>,
        publish: mpsc::Sender<Snapshot>,
    ) -> Self {
        Self {
            aggregate: Aggregate::new(identity, max_items, Utc::now()),
            store,
            events,
            publish,
        }
    }

    /// Run until a terminate message arrives or every sender is gone.
    ///
    /// Returns an error only when the initial snapshot cannot be produced.
    pub async fn run(mut self) -> Result<()> {
        self.startup().await?;

        while let Some(message) = self.events.recv().await {
            match message {
                EngineMessage::Feed(event) => self.handle(event).await,
                EngineMessage::Terminate => {
                    info!("Aggregation engine terminating");
                    return Ok(());
                }
            }
        }

        debug!("Event channel closed");
        Ok(())
    }

    /// Restore the persisted feed and hand off the initial snapshot.
    async fn startup(&mut self) -> Result<()> {
        let now = Utc::now();
        let mut persist = true;

        if let Some(loaded) = self.store.load().await {
            let loaded_len = loaded.items.len();
            let candidates: Vec<_> = loaded
                .items
                .iter()
                .filter_map(|raw| SourceAdapter::Http.transform(raw, loaded.fetched_at))
                .collect();
            self.aggregate.merge(candidates);

            match loaded.updated {
                Some(updated) if self.aggregate.len() == loaded_len => {
                    self.aggregate.updated_at = updated;
                    persist = false;
                }
                _ => self.aggregate.updated_at = now,
            }

            info!(
                items = self.aggregate.len(),
                loaded = loaded_len,
                "Restored persisted feed"
            );
        }

        let rendered = match render_atom(&self.aggregate) {
            Ok(rendered) => rendered,
            Err(e) => {
                error!("Failed to render initial snapshot: {}", e);
                return Err(e);
            }
        };

        self.publish(&rendered).await;
        if persist {
            self.persist(&rendered).await;
        }
        Ok(())
    }

    async fn handle(&mut self, event: FeedEvent) {
        let FeedEvent {
            locator,
            adapter,
            feed,
        } = event;

        let total = feed.items.len();
        let candidates: Vec<_> = feed
            .items
            .iter()
            .filter_map(|raw| adapter.transform(raw, feed.fetched_at))
            .collect();
        let skipped = total - candidates.len();
        if skipped > 0 {
            debug!(source = %locator, skipped, "Skipped items");
        }

        if !self.aggregate.merge(candidates) {
            debug!(source = %locator, items = total, "No change");
            return;
        }

        self.aggregate.touch(Utc::now());
        info!(
            source = %locator,
            items = self.aggregate.len(),
            "Merged feed changed"
        );

        match render_atom(&self.aggregate) {
            Ok(rendered) => {
                self.publish(&rendered).await;
                self.persist(&rendered).await;
            }
            Err(e) => error!("Failed to render feed, keeping previous snapshot: {}", e),
        }
    }

    async fn publish(&self, rendered: &str) {
        let snapshot = Snapshot::new(
            rendered.to_string(),
            self.aggregate.updated_at,
            self.aggregate.len(),
        );
        if self.publish.send(snapshot).await.is_err() {
            warn!("Publication channel closed, snapshot dropped");
        }
    }

    async fn persist(&self, rendered: &str) {
        if let Err(e) = self.store.save(rendered).await {
            error!("Failed to save feed: {}", e);
        }
    }
}
