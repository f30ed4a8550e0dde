//! Periodic ingestion loop.
//!
//! Each tick runs one cycle: select the least recently fetched feed (marking
//! it fetched), fetch its document, ingest the items. Cycle errors are logged
//! and the loop carries on with the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use super::fetcher::FeedSource;
use super::ingester::{IngestResult, Ingester};
use super::selector::FeedSelector;
use super::types::Feed;
use crate::clock::Clock;
use crate::db::Database;
use crate::{ErrorScope, GatorError};

/// Default number of items ingested per document.
pub const DEFAULT_MAX_ITEMS_PER_FEED: usize = 100;

/// How a single cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A feed was fetched and its items ingested.
    Ingested { feed: Feed, result: IngestResult },
    /// There was nothing to select.
    NoFeeds,
    /// Selection, fetch or decode failed. `feed` is set when selection succeeded.
    Failed {
        feed: Option<Feed>,
        error: GatorError,
    },
    /// Shutdown was requested while the fetch was in flight.
    Cancelled,
}

/// Drives the select, fetch and ingest cycle.
pub struct Scheduler<S: FeedSource, C: Clock> {
    db: Arc<Database>,
    source: S,
    clock: C,
    max_items: usize,
}

impl<S: FeedSource, C: Clock> Scheduler<S, C> {
    /// Create a scheduler from its dependencies.
    pub fn new(db: Arc<Database>, source: S, clock: C) -> Self {
        Self {
            db,
            source,
            clock,
            max_items: DEFAULT_MAX_ITEMS_PER_FEED,
        }
    }

    /// Limit the number of items ingested per document.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Run cycles every `period` until `shutdown` turns true (or its sender is dropped).
    ///
    /// The first cycle starts immediately. A slow cycle delays the next tick
    /// rather than causing a burst of catch-up cycles.
    pub async fn run(&self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval = ?period, "collecting feeds");

        // interval() panics on a zero period
        let mut timer = interval(period.max(Duration::from_millis(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let stop = *shutdown.borrow();
            if stop {
                break;
            }

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = timer.tick() => {}
            }

            if let CycleOutcome::Cancelled = self.run_cycle(&mut shutdown).await {
                break;
            }
        }

        info!("feed collection stopped");
    }

    /// Run one cycle.
    ///
    /// The fetch is raced against `shutdown`; ingestion, once started, runs to
    /// completion.
    pub async fn run_cycle(&self, shutdown: &mut watch::Receiver<bool>) -> CycleOutcome {
        let selector = FeedSelector::new(self.db.pool(), &self.clock);
        let feed = match selector.select_next().await {
            Ok(feed) => feed,
            Err(GatorError::NoFeedsRegistered) => {
                warn!("no feeds registered, skipping cycle");
                return CycleOutcome::NoFeeds;
            }
            Err(e) => {
                error!(error = %e, "failed to select next feed");
                return CycleOutcome::Failed {
                    feed: None,
                    error: e,
                };
            }
        };

        info!(feed_id = feed.id, name = %feed.name, url = %feed.url, "fetching feed");

        let fetched = tokio::select! {
            biased;
            _ = wait_for_shutdown(shutdown) => Err(GatorError::Cancelled),
            result = self.source.fetch(&feed.url) => result,
        };

        let document = match fetched {
            Ok(document) => document,
            Err(e) => {
                match e.scope() {
                    ErrorScope::Informational => {
                        info!(feed_id = feed.id, "shutdown requested, abandoning fetch");
                        return CycleOutcome::Cancelled;
                    }
                    ErrorScope::Cycle => {
                        warn!(feed_id = feed.id, url = %feed.url, error = %e, "failed to fetch feed")
                    }
                    ErrorScope::Command => {
                        error!(feed_id = feed.id, url = %feed.url, error = %e, "failed to fetch feed")
                    }
                }
                return CycleOutcome::Failed {
                    feed: Some(feed),
                    error: e,
                };
            }
        };

        let result = Ingester::new(self.db.pool(), self.max_items)
            .ingest(feed.id, &document)
            .await;

        info!(
            feed_id = feed.id,
            title = %document.title,
            inserted = result.inserted,
            skipped = result.skipped,
            failed = result.failed,
            "feed ingested"
        );

        CycleOutcome::Ingested { feed, result }
    }
}

/// Resolves once the shutdown flag is true or the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow_and_update();
        if stop {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
