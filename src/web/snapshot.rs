//! The currently published snapshot.

use std::sync::Arc;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

/// Rendered copy of the aggregate, immutable once built.
#[derive(Debug, Clone)]
pub struct Snapshot {
    body: Bytes,
    updated_at: DateTime<Utc>,
    items: usize,
}

impl Snapshot {
    pub fn new(body: impl Into<Bytes>, updated_at: DateTime<Utc>, items: usize) -> Self {
        Self {
            body: body.into(),
            updated_at,
            items,
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn items(&self) -> usize {
        self.items
    }
}

/// Slot holding the snapshot served to clients.
///
/// Written only by the drain task, read by every request.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSlot {
    inner: Arc<RwLock<Option<Snapshot>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The installed snapshot, if any.
    pub async fn current(&self) -> Option<Snapshot> {
        self.inner.read().await.clone()
    }

    /// Replace the installed snapshot.
    pub async fn install(&self, snapshot: Snapshot) {
        *self.inner.write().await = Some(snapshot);
    }

    /// Install every snapshot received on `rx` until the channel closes.
    pub fn spawn_drain(&self, mut rx: mpsc::Receiver<Snapshot>) -> JoinHandle<()> {
        let slot = self.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                debug!(
                    items = snapshot.items(),
                    bytes = snapshot.body().len(),
                    "Installing snapshot"
                );
                slot.install(snapshot).await;
            }
            debug!("Publication channel closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_slot() {
        let slot = SnapshotSlot::new();
        assert!(slot.current().await.is_none());
    }

    #[tokio::test]
    async fn test_drain_keeps_last_snapshot() {
        let slot = SnapshotSlot::new();
        let (tx, rx) = mpsc::channel(4);
        let drain = slot.spawn_drain(rx);

        tx.send(Snapshot::new("first", Utc::now(), 1)).await.unwrap();
        tx.send(Snapshot::new("second", Utc::now(), 2)).await.unwrap();
        drop(tx);
        drain.await.unwrap();

        let current = slot.current().await.unwrap();
        assert_eq!(current.body().as_ref(), b"second");
        assert_eq!(current.items(), 2);
    }
}
