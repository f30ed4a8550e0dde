//! Feed ingestion for gator.
//!
//! Feeds, posts and follows live in the database; the scheduler polls one
//! feed per tick, choosing the one that has waited longest.

pub mod fetcher;
pub mod ingester;
pub mod repository;
pub mod scheduler;
pub mod selector;
pub mod types;

pub use fetcher::{parse_feed, validate_feed_url, validate_url, FeedSource, RssFetcher};
pub use ingester::{IngestResult, Ingester, ItemOutcome};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{CycleOutcome, Scheduler, DEFAULT_MAX_ITEMS_PER_FEED};
pub use selector::FeedSelector;
pub use types::{
    CreatePostOutcome, Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, ParsedFeed, ParsedItem,
    Post, PostWithFeed,
};
