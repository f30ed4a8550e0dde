//! Feed selection over the fetch ledger.

use tracing::debug;

use super::repository::FeedRepository;
use super::types::Feed;
use crate::clock::Clock;
use crate::db::DbPool;
use crate::{GatorError, Result};

/// Picks the next feed to poll and stamps it in the ledger.
pub struct FeedSelector<'a, C: Clock> {
    pool: &'a DbPool,
    clock: &'a C,
}

impl<'a, C: Clock> FeedSelector<'a, C> {
    /// Create a selector over the given pool and clock.
    pub fn new(pool: &'a DbPool, clock: &'a C) -> Self {
        Self { pool, clock }
    }

    /// Choose the least recently fetched feed and mark it fetched now.
    ///
    /// The mark is written before the caller fetches anything, so a feed whose
    /// fetch fails still moves to the back of the rotation and is retried only
    /// after every other feed has had a turn.
    pub async fn select_next(&self) -> Result<Feed> {
        let repo = FeedRepository::new(self.pool);

        let feed = repo
            .get_next_to_fetch()
            .await?
            .ok_or(GatorError::NoFeedsRegistered)?;

        debug!(
            feed_id = feed.id,
            previous = ?feed.last_fetched_at,
            "selected feed"
        );

        repo.mark_fetched(feed.id, self.clock.now()).await
    }
}
