//! feedmerge - merges many feeds into one.
//!
//! Sources are polled on jittered schedules; new items are deduplicated,
//! ordered newest first and bounded, then written atomically to disk and
//! served as a single Atom feed over HTTP.

pub mod aggregate;
pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod logging;
pub mod source;
pub mod store;
pub mod watcher;
pub mod web;

pub use aggregate::{Aggregate, Author, FeedIdentity, OutputItem};
pub use app::{run, ShutdownCoordinator, ShutdownReason};
pub use config::{BuildInfo, Config};
pub use engine::{AggregationEngine, EngineMessage, FeedEvent};
pub use error::{FeedmergeError, Result};
pub use fetcher::{FeedFetcher, HttpFetcher};
pub use source::{Source, SourceAdapter};
pub use store::{FileStore, SnapshotStore};
pub use watcher::{SchedulePolicy, Watcher};
