//! Per-source polling.
//!
//! Each watcher owns one [`Source`] and its own timer. It stops as soon as the
//! shared stop flag turns true, whether it is sleeping, fetching or waiting on
//! the event channel; whatever it was doing at that point is dropped.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::engine::{EngineMessage, FeedEvent};
use crate::feed::RawFeed;
use crate::fetcher::FeedFetcher;
use crate::source::Source;

/// When a watcher polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Delay before the first poll.
    pub initial_delay: Duration,
    /// Inclusive lower bound of the poll interval, in minutes.
    pub min_interval_mins: u64,
    /// Exclusive upper bound of the poll interval, in minutes.
    pub max_interval_mins: u64,
}

impl SchedulePolicy {
    /// Policy for the watcher at `index`; first polls are staggered by
    /// `initial_pause_secs`.
    pub fn for_index(config: &ScheduleConfig, index: usize) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.initial_pause_secs * index as u64),
            min_interval_mins: config.min_interval_mins,
            max_interval_mins: config.max_interval_mins,
        }
    }

    /// A random whole number of minutes in `[min, max)`.
    pub fn next_interval(&self) -> Duration {
        let minutes = if self.max_interval_mins > self.min_interval_mins {
            rand::rng().random_range(self.min_interval_mins..self.max_interval_mins)
        } else {
            self.min_interval_mins
        };
        Duration::from_secs(minutes * 60)
    }
}

pub struct Watcher {
    source: Source,
    schedule: SchedulePolicy,
    fetcher: Arc<dyn FeedFetcher>,
    events: mpsc::Sender<EngineMessage>,
    stop: watch::Receiver<bool>,
}

impl Watcher {
    pub fn new(
        source: Source,
        schedule: SchedulePolicy,
        fetcher: Arc<dyn FeedFetcher>,
        events: mpsc::Sender<EngineMessage>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            schedule,
            fetcher,
            events,
            stop,
        }
    }

    /// Run on a new task; the handle completes once the watcher stopped.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        let Watcher {
            mut source,
            schedule,
            fetcher,
            events,
            mut stop,
        } = self;

        debug!(
            source = %source.locator,
            adapter = %source.adapter,
            "Watcher started, first poll in {}s",
            schedule.initial_delay.as_secs()
        );

        let mut delay = schedule.initial_delay;
        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => break,
                _ = sleep(delay) => {}
            }

            let polled = tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => break,
                polled = poll(&mut source, fetcher.as_ref()) => polled,
            };

            if let Some(feed) = polled {
                let event = EngineMessage::Feed(FeedEvent {
                    locator: source.locator.clone(),
                    adapter: source.adapter,
                    feed,
                });
                tokio::select! {
                    biased;
                    _ = stop_requested(&mut stop) => break,
                    sent = events.send(event) => {
                        if sent.is_err() {
                            debug!(source = %source.locator, "Event channel closed");
                            break;
                        }
                    }
                }
            }

            delay = schedule.next_interval();
            debug!(
                source = %source.locator,
                "Next poll in {} minutes",
                delay.as_secs() / 60
            );
        }

        info!(source = %source.locator, "Watcher stopped");
    }
}

/// Resolve (if needed) and fetch once.
async fn poll(source: &mut Source, fetcher: &dyn FeedFetcher) -> Option<RawFeed> {
    let Some(url) = source.feed_url(fetcher).await else {
        warn!(source = %source.locator, "Could not resolve feed URL, skipping this cycle");
        return None;
    };

    match fetcher.fetch_feed(&url).await {
        Ok(feed) => {
            debug!(source = %source.locator, items = feed.items.len(), "Fetched feed");
            Some(feed)
        }
        Err(e) => {
            warn!(source = %source.locator, url = %url, error = %e, "Fetch failed");
            source.invalidate();
            None
        }
    }
}

/// Completes once the stop flag is true or its sender is gone.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}
