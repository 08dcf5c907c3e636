//! Process wiring and coordinated shutdown.
//!
//! [`ShutdownCoordinator::start`] builds the sources, binds the publish server
//! and spawns every task. [`ShutdownCoordinator::run_until`] waits for a
//! termination signal or an abnormal stop of the server or the engine, then
//! tears everything down, bounding each wait by the configured grace period.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::aggregate::FeedIdentity;
use crate::config::Config;
use crate::engine::{AggregationEngine, EngineMessage};
use crate::error::{FeedmergeError, Result};
use crate::fetcher::FeedFetcher;
use crate::source::Source;
use crate::store::SnapshotStore;
use crate::watcher::{SchedulePolicy, Watcher};
use crate::web::{PublishServer, SnapshotSlot};

/// Publication channel depth; the drain keeps only the last snapshot anyway.
const PUBLISH_CHANNEL_CAPACITY: usize = 4;

/// Why the coordinator shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal was received.
    Signal,
    /// The publish server stopped on its own.
    ServerStopped,
    /// The aggregation engine stopped on its own.
    EngineStopped,
}

impl ShutdownReason {
    /// Whether the shutdown was requested rather than caused by a failure.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Signal)
    }
}

/// Owns every running task of the pipeline.
pub struct ShutdownCoordinator {
    local_addr: SocketAddr,
    slot: SnapshotSlot,
    grace: Duration,
    stop: watch::Sender<bool>,
    events: mpsc::Sender<EngineMessage>,
    engine: JoinHandle<Result<()>>,
    server: JoinHandle<Result<()>>,
    drain: JoinHandle<()>,
    watchers: Vec<JoinHandle<()>>,
}

impl ShutdownCoordinator {
    /// Start the pipeline.
    ///
    /// Fails when no configured source is usable or the listen address
    /// cannot be bound; nothing is left running in that case.
    pub async fn start(
        config: &Config,
        fetcher: Arc<dyn FeedFetcher>,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self> {
        let sources = build_sources(&config.sources)?;
        info!("Watching {} source(s)", sources.len());

        let slot = SnapshotSlot::new();
        let server = PublishServer::bind(config.listen_addr()?, &config.server, slot.clone()).await?;
        let local_addr = server.local_addr();

        let (stop_tx, _) = watch::channel(false);
        let (events_tx, events_rx) = mpsc::channel(sources.len() + 1);
        let (publish_tx, publish_rx) = mpsc::channel(PUBLISH_CHANNEL_CAPACITY);

        let drain = slot.spawn_drain(publish_rx);

        let identity = FeedIdentity {
            id: config.feed.id.clone(),
            title: config.feed.title.clone(),
            self_link: config.feed.self_link.clone(),
        };
        let engine = AggregationEngine::new(
            identity,
            config.max_items,
            store,
            events_rx,
            publish_tx,
        );
        let engine = tokio::spawn(engine.run());

        let server = tokio::spawn(server.serve(stop_tx.subscribe()));

        let watchers = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                Watcher::new(
                    source,
                    SchedulePolicy::for_index(&config.schedule, index),
                    fetcher.clone(),
                    events_tx.clone(),
                    stop_tx.subscribe(),
                )
                .spawn()
            })
            .collect();

        Ok(Self {
            local_addr,
            slot,
            grace: Duration::from_secs(config.server.shutdown_timeout_secs),
            stop: stop_tx,
            events: events_tx,
            engine,
            server,
            drain,
            watchers,
        })
    }

    /// Address the publish server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Slot holding the currently published snapshot.
    pub fn snapshots(&self) -> SnapshotSlot {
        self.slot.clone()
    }

    /// Run until `signal` completes or a component stops abnormally, then
    /// shut everything down.
    pub async fn run_until<F>(mut self, signal: F) -> ShutdownReason
    where
        F: Future<Output = ()>,
    {
        let mut engine_done = false;
        let mut server_done = false;

        let reason = tokio::select! {
            _ = signal => {
                info!("Shutdown signal received");
                ShutdownReason::Signal
            }
            result = &mut self.server => {
                server_done = true;
                log_task_exit("Publish server", result);
                ShutdownReason::ServerStopped
            }
            result = &mut self.engine => {
                engine_done = true;
                log_task_exit("Aggregation engine", result);
                ShutdownReason::EngineStopped
            }
        };

        self.shutdown(engine_done, server_done).await;
        reason
    }

    async fn shutdown(mut self, engine_done: bool, server_done: bool) {
        let grace = self.grace;

        if !engine_done
            && timeout(grace, self.events.send(EngineMessage::Terminate))
                .await
                .map_or(true, |sent| sent.is_err())
        {
            warn!("Could not deliver terminate message to the engine");
        }

        let _ = self.stop.send(true);

        let aborts: Vec<AbortHandle> = self.watchers.iter().map(|h| h.abort_handle()).collect();
        let count = aborts.len();
        if timeout(grace, join_all(self.watchers)).await.is_err() {
            warn!("Watchers did not stop within {:?}, aborting", grace);
            aborts.iter().for_each(AbortHandle::abort);
        } else {
            info!("All {} watcher(s) stopped", count);
        }

        if !server_done {
            match timeout(grace, &mut self.server).await {
                Ok(result) => log_task_exit("Publish server", result),
                Err(_) => {
                    warn!("Publish server did not stop within {:?}, aborting", grace);
                    self.server.abort();
                }
            }
        }

        if !engine_done {
            match timeout(grace, &mut self.engine).await {
                Ok(result) => log_task_exit("Aggregation engine", result),
                Err(_) => {
                    warn!("Aggregation engine did not stop within {:?}, aborting", grace);
                    self.engine.abort();
                }
            }
        }

        drop(self.events);
        if timeout(grace, &mut self.drain).await.is_err() {
            self.drain.abort();
        }

        info!("Shutdown complete");
    }
}

/// Start the pipeline and run it until `signal` completes.
pub async fn run<F>(
    config: &Config,
    fetcher: Arc<dyn FeedFetcher>,
    store: Arc<dyn SnapshotStore>,
    signal: F,
) -> Result<ShutdownReason>
where
    F: Future<Output = ()>,
{
    let coordinator = ShutdownCoordinator::start(config, fetcher, store).await?;
    Ok(coordinator.run_until(signal).await)
}

/// Sources for every usable locator; unusable ones are logged and dropped.
pub fn build_sources(locators: &[String]) -> Result<Vec<Source>> {
    let sources: Vec<Source> = locators
        .iter()
        .filter_map(|locator| {
            let source = Source::new(locator.as_str());
            match &source {
                Some(s) => info!(source = %s.locator, adapter = %s.adapter, "Source configured"),
                None => warn!(source = %locator, "Unknown source type, ignoring"),
            }
            source
        })
        .collect();

    if sources.is_empty() {
        return Err(FeedmergeError::Config(
            "no usable sources; only http(s) feed URLs are supported".to_string(),
        ));
    }
    Ok(sources)
}

fn log_task_exit(
    name: &str,
    result: std::result::Result<Result<()>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(())) => info!("{} stopped", name),
        Ok(Err(e)) => error!("{} failed: {}", name, e),
        Err(e) => error!("{} task failed: {}", name, e),
    }
}
