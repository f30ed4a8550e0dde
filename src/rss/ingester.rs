//! Converts decoded feed items into stored posts.

use tracing::{debug, error, warn};

use super::repository::PostRepository;
use super::types::{CreatePostOutcome, NewPost, ParsedFeed, ParsedItem};
use crate::datetime::parse_pub_date;
use crate::db::DbPool;

/// Per-document ingestion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestResult {
    /// Items stored as new posts.
    pub inserted: usize,
    /// Items whose URL was already stored.
    pub skipped: usize,
    /// Items that could not be stored.
    pub failed: usize,
}

impl IngestResult {
    /// Number of items looked at.
    pub fn total(&self) -> usize {
        self.inserted + self.skipped + self.failed
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Inserted => self.inserted += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
    }
}

/// What happened to a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Inserted,
    Skipped,
    Failed,
}

/// Writes a decoded document's items as posts, one item at a time.
pub struct Ingester<'a> {
    pool: &'a DbPool,
    max_items: usize,
}

impl<'a> Ingester<'a> {
    /// Create an ingester that stores at most `max_items` items per document.
    pub fn new(pool: &'a DbPool, max_items: usize) -> Self {
        Self { pool, max_items }
    }

    /// Ingest every item of `document` into `feed_id`, in document order.
    ///
    /// Never fails as a whole: each item's problem is logged and counted.
    pub async fn ingest(&self, feed_id: i64, document: &ParsedFeed) -> IngestResult {
        let mut result = IngestResult::default();

        if document.items.len() > self.max_items {
            warn!(
                feed_id,
                items = document.items.len(),
                max = self.max_items,
                "document has more items than allowed; ignoring the rest"
            );
        }

        for item in document.items.iter().take(self.max_items) {
            result.record(self.ingest_item(feed_id, item).await);
        }

        result
    }

    async fn ingest_item(&self, feed_id: i64, item: &ParsedItem) -> ItemOutcome {
        if item.link.is_empty() {
            warn!(feed_id, title = %item.title, "item has no link, not stored");
            return ItemOutcome::Failed;
        }

        let mut post = NewPost::new(feed_id, item.title.as_str(), item.link.as_str())
            .with_description(item.description.as_str());

        if !item.pub_date.is_empty() {
            match parse_pub_date(&item.pub_date) {
                Ok(published_at) => post = post.with_published_at(published_at),
                Err(e) => warn!(
                    feed_id,
                    url = %item.link,
                    pub_date = %item.pub_date,
                    error = %e,
                    "unparseable publication date, storing without one"
                ),
            }
        }

        match PostRepository::new(self.pool).create(&post).await {
            Ok(CreatePostOutcome::Inserted(stored)) => {
                debug!(feed_id, post_id = stored.id, url = %stored.url, "stored post");
                ItemOutcome::Inserted
            }
            Ok(CreatePostOutcome::DuplicateSkipped) => {
                debug!(feed_id, url = %item.link, "post already stored");
                ItemOutcome::Skipped
            }
            Err(e) => {
                error!(feed_id, url = %item.link, error = %e, "failed to store post");
                ItemOutcome::Failed
            }
        }
    }
}
