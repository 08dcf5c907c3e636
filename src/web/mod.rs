//! HTTP publication of the merged feed.

pub mod router;
pub mod server;
pub mod snapshot;

pub use router::create_router;
pub use server::PublishServer;
pub use snapshot::{Snapshot, SnapshotSlot};
