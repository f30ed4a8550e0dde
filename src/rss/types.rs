//! Feed, post and parsed-document types.

use chrono::{DateTime, Utc};

/// A registered feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Source URL (unique).
    pub url: String,
    /// Owning user.
    pub user_id: i64,
    /// When the feed was registered.
    pub created_at: DateTime<Utc>,
    /// When the feed row was last modified.
    pub updated_at: DateTime<Utc>,
    /// Fetch ledger entry. `None` means never fetched.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl Feed {
    /// Whether the feed has never been polled.
    pub fn is_never_fetched(&self) -> bool {
        self.last_fetched_at.is_none()
    }
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Source URL.
    pub url: String,
    /// Owning user.
    pub user_id: i64,
}

impl NewFeed {
    /// Create a new feed request.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: i64) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// Feed joined with its owner's name, for listings.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Owner's user name.
    pub owner_name: String,
}

/// A user following a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: i64,
    /// Following user.
    pub user_id: i64,
    /// Followed feed.
    pub feed_id: i64,
    /// Following user's name.
    pub user_name: String,
    /// Followed feed's name.
    pub feed_name: String,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
}

/// A persisted feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Owning feed.
    pub feed_id: i64,
    /// Entry title.
    pub title: String,
    /// Entry URL. Unique across all posts.
    pub url: String,
    /// Entry description, if the document had a non-empty one.
    pub description: Option<String>,
    /// Publication time, if the document's date could be parsed.
    pub published_at: Option<DateTime<Utc>>,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post row was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Post joined with its feed's name, for browsing.
#[derive(Debug, Clone)]
pub struct PostWithFeed {
    /// The post.
    pub post: Post,
    /// Name of the feed the post came from.
    pub feed_name: String,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Owning feed.
    pub feed_id: i64,
    /// Entry title.
    pub title: String,
    /// Entry URL (dedup key).
    pub url: String,
    /// Entry description.
    pub description: Option<String>,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Create a new post request.
    pub fn new(feed_id: i64, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            feed_id,
            title: title.into(),
            url: url.into(),
            description: None,
            published_at: None,
        }
    }

    /// Set the description. Empty descriptions are stored as absent.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    /// Set the published date.
    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// Result of a post insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePostOutcome {
    /// The post was stored.
    Inserted(Post),
    /// A post with the same URL already exists; nothing was written.
    DuplicateSkipped,
}

/// Decoded syndication document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Channel title.
    pub title: String,
    /// Channel link.
    pub link: String,
    /// Channel description.
    pub description: String,
    /// Items in document order.
    pub items: Vec<ParsedItem>,
}

/// Decoded syndication item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    /// Item title.
    pub title: String,
    /// Item link (becomes the post URL).
    pub link: String,
    /// Item description with HTML stripped. May be empty.
    pub description: String,
    /// Publication date as RFC 2822 text. May be empty or malformed.
    pub pub_date: String,
}

impl ParsedItem {
    /// Create an item with the given link and title.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: String::new(),
            pub_date: String::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the publication date text.
    pub fn with_pub_date(mut self, pub_date: impl Into<String>) -> Self {
        self.pub_date = pub_date.into();
        self
    }
}
