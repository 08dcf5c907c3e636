//! Snapshot persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::feed::{parse_feed, RawFeed};

/// Loads the last persisted snapshot and replaces it on change.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The persisted snapshot, or `None` if absent or unreadable.
    async fn load(&self) -> Option<RawFeed>;

    /// Replace the persisted snapshot with `rendered`.
    async fn save(&self, rendered: &str) -> Result<()>;
}

/// Snapshot stored as a single feed file.
///
/// Saves go through a sibling `<file>.tmp` that is fsynced and then renamed
/// over the destination, so readers only ever see a complete document.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Write `rendered` to the temporary file and flush it to disk.
    pub async fn stage(&self, rendered: &str) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(rendered.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        Ok(temp_path)
    }

    /// Move a staged file over the destination.
    pub async fn commit(&self, staged: &Path) -> Result<()> {
        fs::rename(staged, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(&self) -> Option<RawFeed> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No persisted feed, starting empty");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read persisted feed");
                return None;
            }
        };

        match parse_feed(&bytes, Utc::now()) {
            Ok(feed) => {
                debug!(path = %self.path.display(), items = feed.items.len(), "Loaded persisted feed");
                Some(feed)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Persisted feed is malformed, ignoring it");
                None
            }
        }
    }

    async fn save(&self, rendered: &str) -> Result<()> {
        let staged = match self.stage(rendered).await {
            Ok(staged) => staged,
            Err(e) => {
                let _ = fs::remove_file(self.temp_path()).await;
                return Err(e);
            }
        };

        if let Err(e) = self.commit(&staged).await {
            let _ = fs::remove_file(&staged).await;
            return Err(e);
        }

        debug!(path = %self.path.display(), bytes = rendered.len(), "Saved feed");
        Ok(())
    }
}
