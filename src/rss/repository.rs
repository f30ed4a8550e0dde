//! Feed, post and follow repositories for gator.

use chrono::{DateTime, Utc};

use super::types::{
    CreatePostOutcome, Feed, FeedFollow, FeedWithOwner, NewFeed, NewPost, Post, PostWithFeed,
};
use crate::datetime::{format_timestamp, parse_timestamp};
use crate::db::{is_unique_violation, DbPool};
use crate::{GatorError, Result};

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

/// Row type for feeds from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    name: String,
    url: String,
    user_id: i64,
    created_at: String,
    updated_at: String,
    last_fetched_at: Option<String>,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
            last_fetched_at: row.last_fetched_at.and_then(|s| parse_timestamp(&s)),
        }
    }
}

/// Row type for feeds joined with the owner's name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedWithOwnerRow {
    id: i64,
    name: String,
    url: String,
    user_id: i64,
    created_at: String,
    updated_at: String,
    last_fetched_at: Option<String>,
    owner_name: String,
}

impl From<FeedWithOwnerRow> for FeedWithOwner {
    fn from(row: FeedWithOwnerRow) -> Self {
        let feed = Feed::from(FeedRow {
            id: row.id,
            name: row.name,
            url: row.url,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_fetched_at: row.last_fetched_at,
        });
        FeedWithOwner {
            feed,
            owner_name: row.owner_name,
        }
    }
}

/// Row type for posts from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostRow {
    id: i64,
    feed_id: i64,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at.and_then(|s| parse_timestamp(&s)),
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Row type for posts joined with the feed name.
#[derive(Debug, Clone, sqlx::FromRow)]
struct PostWithFeedRow {
    id: i64,
    feed_id: i64,
    title: String,
    url: String,
    description: Option<String>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
    feed_name: String,
}

impl From<PostWithFeedRow> for PostWithFeed {
    fn from(row: PostWithFeedRow) -> Self {
        let post = Post::from(PostRow {
            id: row.id,
            feed_id: row.feed_id,
            title: row.title,
            url: row.url,
            description: row.description,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        });
        PostWithFeed {
            post,
            feed_name: row.feed_name,
        }
    }
}

/// Row type for feed follows joined with user and feed names.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedFollowRow {
    id: i64,
    user_id: i64,
    feed_id: i64,
    user_name: String,
    feed_name: String,
    created_at: String,
}

impl From<FeedFollowRow> for FeedFollow {
    fn from(row: FeedFollowRow) -> Self {
        FeedFollow {
            id: row.id,
            user_id: row.user_id,
            feed_id: row.feed_id,
            user_name: row.user_name,
            feed_name: row.feed_name,
            created_at: parse_timestamp(&row.created_at).unwrap_or_else(Utc::now),
        }
    }
}

/// Repository for feeds and the fetch ledger.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Register a new feed. It starts with `last_fetched_at = NULL`.
    pub async fn create(&self, feed: &NewFeed) -> Result<Feed> {
        let now = format_timestamp(&Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO feeds (name, url, user_id, created_at, updated_at, last_fetched_at)
            VALUES ($1, $2, $3, $4, $5, NULL)
            "#,
        )
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation(format!("feed {} is already registered", feed.url))
            } else {
                GatorError::Database(e.to_string())
            }
        })?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| GatorError::NotFound("feed".to_string()))
    }

    /// Get a feed by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Feed>> {
        let query = format!("SELECT {} FROM feeds WHERE id = $1", FEED_COLUMNS);
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let query = format!("SELECT {} FROM feeds WHERE url = $1", FEED_COLUMNS);
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(url)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// List all feeds with their owners (ordered by registration order).
    pub async fn list_with_owners(&self) -> Result<Vec<FeedWithOwner>> {
        let rows = sqlx::query_as::<_, FeedWithOwnerRow>(
            r#"
            SELECT f.id, f.name, f.url, f.user_id, f.created_at, f.updated_at,
                   f.last_fetched_at, u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.id ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedWithOwner::from).collect())
    }

    /// Get the feed that has waited longest for a fetch.
    ///
    /// Never-fetched feeds come first; ties are broken by creation time and then
    /// by ID so the rotation is deterministic.
    pub async fn get_next_to_fetch(&self) -> Result<Option<Feed>> {
        let query = format!(
            r#"
            SELECT {}
            FROM feeds
            ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC
            LIMIT 1
            "#,
            FEED_COLUMNS
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Feed::from))
    }

    /// Record a fetch of the feed at `at` and return the updated feed.
    ///
    /// The ledger never moves backwards: if `at` is earlier than the stored
    /// value (clock skew), the stored value is kept.
    pub async fn mark_fetched(&self, id: i64, at: DateTime<Utc>) -> Result<Feed> {
        let at = format_timestamp(&at);
        let query = format!(
            r#"
            UPDATE feeds
            SET last_fetched_at = CASE
                    WHEN last_fetched_at IS NULL OR last_fetched_at < $1 THEN $1
                    ELSE last_fetched_at
                END,
                updated_at = $1
            WHERE id = $2
            RETURNING {}
            "#,
            FEED_COLUMNS
        );
        let row = sqlx::query_as::<_, FeedRow>(&query)
            .bind(&at)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(Feed::from)
            .ok_or_else(|| GatorError::NotFound(format!("feed {}", id)))
    }
}

/// Repository for posts.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a post unless one with the same URL exists.
    pub async fn create(&self, post: &NewPost) -> Result<CreatePostOutcome> {
        let now = format_timestamp(&Utc::now());
        let published_at = post.published_at.as_ref().map(format_timestamp);

        let result = sqlx::query(
            r#"
            INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(post.feed_id)
        .bind(&post.title)
        .bind(&post.url)
        .bind(&post.description)
        .bind(&published_at)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(CreatePostOutcome::DuplicateSkipped);
        }

        let stored = self
            .get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| GatorError::NotFound("post".to_string()))?;
        Ok(CreatePostOutcome::Inserted(stored))
    }

    /// Get a post by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// Get a post by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE url = $1
            "#,
        )
        .bind(url)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// List posts for a feed in insertion order.
    pub async fn list_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, feed_id, title, url, description, published_at, created_at, updated_at
            FROM posts
            WHERE feed_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(feed_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    /// Count posts for a feed.
    pub async fn count_by_feed(&self, feed_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE feed_id = $1")
            .bind(feed_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Newest posts from the feeds a user follows.
    ///
    /// Posts without a publication time sort after dated ones.
    pub async fn list_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<PostWithFeed>> {
        let rows = sqlx::query_as::<_, PostWithFeedRow>(
            r#"
            SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at,
                   p.created_at, p.updated_at, f.name AS feed_name
            FROM posts p
            JOIN feeds f ON f.id = p.feed_id
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = $1
            ORDER BY p.published_at IS NULL, p.published_at DESC, p.id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(PostWithFeed::from).collect())
    }
}

/// Repository for feed follows.
pub struct FeedFollowRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedFollowRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Make a user follow a feed.
    pub async fn create(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let now = format_timestamp(&Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::Validation("already following this feed".to_string())
            } else {
                GatorError::Database(e.to_string())
            }
        })?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| GatorError::NotFound("feed follow".to_string()))
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<FeedFollow>> {
        let row = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name, f.name AS feed_name,
                   ff.created_at
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(FeedFollow::from))
    }

    /// List the feeds a user follows (ordered by follow time).
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>> {
        let rows = sqlx::query_as::<_, FeedFollowRow>(
            r#"
            SELECT ff.id, ff.user_id, ff.feed_id, u.name AS user_name, f.name AS feed_name,
                   ff.created_at
            FROM feed_follows ff
            JOIN users u ON u.id = ff.user_id
            JOIN feeds f ON f.id = ff.feed_id
            WHERE ff.user_id = $1
            ORDER BY ff.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FeedFollow::from).collect())
    }

    /// Remove a follow. Returns false when the user did not follow the feed.
    pub async fn delete(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = $1 AND feed_id = $2")
            .bind(user_id)
            .bind(feed_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::Database;
    use chrono::{Duration, TimeZone};

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    async fn create_test_user(db: &Database, name: &str) -> i64 {
        let repo = UserRepository::new(db.pool());
        repo.create(&NewUser::new(name)).await.unwrap().id
    }

    #[tokio::test]
    async fn test_create_feed() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let feed = repo
            .create(&NewFeed::new("Boot.dev", "https://blog.boot.dev/index.xml", user_id))
            .await
            .unwrap();

        assert!(feed.id > 0);
        assert_eq!(feed.name, "Boot.dev");
        assert_eq!(feed.user_id, user_id);
        assert!(feed.last_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_feed_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let url = "https://example.com/feed.xml";
        repo.create(&NewFeed::new("One", url, user_id)).await.unwrap();
        let result = repo.create(&NewFeed::new("Two", url, user_id)).await;
        assert!(matches!(result, Err(GatorError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_feed_unknown_user() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());

        let result = repo
            .create(&NewFeed::new("Orphan", "https://example.com/feed.xml", 42))
            .await;
        assert!(matches!(result, Err(GatorError::Database(_))));
    }

    #[tokio::test]
    async fn test_get_feed_by_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let url = "https://example.com/feed.xml";
        let created = repo.create(&NewFeed::new("Feed", url, user_id)).await.unwrap();

        let found = repo.get_by_url(url).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(repo.get_by_url("https://other.example.com/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_with_owners() {
        let db = setup_db().await;
        let alice = create_test_user(&db, "alice").await;
        let bob = create_test_user(&db, "bob").await;
        let repo = FeedRepository::new(db.pool());

        repo.create(&NewFeed::new("A", "https://a.example.com/feed", alice))
            .await
            .unwrap();
        repo.create(&NewFeed::new("B", "https://b.example.com/feed", bob))
            .await
            .unwrap();

        let feeds = repo.list_with_owners().await.unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].feed.name, "A");
        assert_eq!(feeds[0].owner_name, "alice");
        assert_eq!(feeds[1].owner_name, "bob");
    }

    #[tokio::test]
    async fn test_next_to_fetch_empty() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());
        assert!(repo.get_next_to_fetch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_to_fetch_prefers_never_fetched() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let a = repo
            .create(&NewFeed::new("A", "https://a.example.com/feed", user_id))
            .await
            .unwrap();
        let b = repo
            .create(&NewFeed::new("B", "https://b.example.com/feed", user_id))
            .await
            .unwrap();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        repo.mark_fetched(a.id, t0).await.unwrap();

        let next = repo.get_next_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, b.id);
    }

    #[tokio::test]
    async fn test_next_to_fetch_oldest_first() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let a = repo
            .create(&NewFeed::new("A", "https://a.example.com/feed", user_id))
            .await
            .unwrap();
        let b = repo
            .create(&NewFeed::new("B", "https://b.example.com/feed", user_id))
            .await
            .unwrap();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        repo.mark_fetched(a.id, t0 + Duration::hours(1)).await.unwrap();
        repo.mark_fetched(b.id, t0).await.unwrap();

        let next = repo.get_next_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, b.id);
    }

    #[tokio::test]
    async fn test_next_to_fetch_tie_broken_by_id() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let a = repo
            .create(&NewFeed::new("A", "https://a.example.com/feed", user_id))
            .await
            .unwrap();
        let b = repo
            .create(&NewFeed::new("B", "https://b.example.com/feed", user_id))
            .await
            .unwrap();

        // Same created_at and same ledger value for both rows
        sqlx::query("UPDATE feeds SET created_at = '2024-01-01T00:00:00.000000Z', last_fetched_at = '2024-01-02T00:00:00.000000Z'")
            .execute(db.pool())
            .await
            .unwrap();

        let next = repo.get_next_to_fetch().await.unwrap().unwrap();
        assert_eq!(next.id, a.id.min(b.id));
    }

    #[tokio::test]
    async fn test_mark_fetched_sets_timestamp() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let feed = repo
            .create(&NewFeed::new("A", "https://a.example.com/feed", user_id))
            .await
            .unwrap();

        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let marked = repo.mark_fetched(feed.id, t0).await.unwrap();
        assert_eq!(marked.last_fetched_at, Some(t0));

        let reloaded = repo.get_by_id(feed.id).await.unwrap().unwrap();
        assert_eq!(reloaded.last_fetched_at, Some(t0));
    }

    #[tokio::test]
    async fn test_mark_fetched_never_moves_backwards() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let repo = FeedRepository::new(db.pool());

        let feed = repo
            .create(&NewFeed::new("A", "https://a.example.com/feed", user_id))
            .await
            .unwrap();

        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        repo.mark_fetched(feed.id, t1).await.unwrap();

        let earlier = t1 - Duration::minutes(5);
        let marked = repo.mark_fetched(feed.id, earlier).await.unwrap();
        assert_eq!(marked.last_fetched_at, Some(t1));

        let later = t1 + Duration::minutes(5);
        let marked = repo.mark_fetched(feed.id, later).await.unwrap();
        assert_eq!(marked.last_fetched_at, Some(later));
    }

    #[tokio::test]
    async fn test_mark_fetched_unknown_feed() {
        let db = setup_db().await;
        let repo = FeedRepository::new(db.pool());

        let result = repo.mark_fetched(999, Utc::now()).await;
        assert!(matches!(result, Err(GatorError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_post_and_skip_duplicate_url() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("A", "https://a.example.com/feed", user_id))
            .await
            .unwrap();
        let repo = PostRepository::new(db.pool());

        let published = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let new_post = NewPost::new(feed.id, "Hello", "https://a.example.com/hello")
            .with_description("First post")
            .with_published_at(published);

        let outcome = repo.create(&new_post).await.unwrap();
        let post = match outcome {
            CreatePostOutcome::Inserted(post) => post,
            other => panic!("expected insert, got {:?}", other),
        };
        assert_eq!(post.title, "Hello");
        assert_eq!(post.description.as_deref(), Some("First post"));
        assert_eq!(post.published_at, Some(published));

        let again = repo.create(&new_post).await.unwrap();
        assert_eq!(again, CreatePostOutcome::DuplicateSkipped);
        assert_eq!(repo.count_by_feed(feed.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_post_url_unique_across_feeds() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let feeds = FeedRepository::new(db.pool());
        let a = feeds
            .create(&NewFeed::new("A", "https://a.example.com/feed", user_id))
            .await
            .unwrap();
        let b = feeds
            .create(&NewFeed::new("B", "https://b.example.com/feed", user_id))
            .await
            .unwrap();
        let repo = PostRepository::new(db.pool());

        let url = "https://shared.example.com/story";
        repo.create(&NewPost::new(a.id, "Story", url)).await.unwrap();
        let outcome = repo.create(&NewPost::new(b.id, "Story", url)).await.unwrap();

        assert_eq!(outcome, CreatePostOutcome::DuplicateSkipped);
        assert_eq!(repo.get_by_url(url).await.unwrap().unwrap().feed_id, a.id);
    }

    #[tokio::test]
    async fn test_follow_lifecycle() {
        let db = setup_db().await;
        let user_id = create_test_user(&db, "kahya").await;
        let feed = FeedRepository::new(db.pool())
            .create(&NewFeed::new("A", "https://a.example.com/feed", user_id))
            .await
            .unwrap();
        let repo = FeedFollowRepository::new(db.pool());

        let follow = repo.create(user_id, feed.id).await.unwrap();
        assert_eq!(follow.user_name, "kahya");
        assert_eq!(follow.feed_name, "A");

        let duplicate = repo.create(user_id, feed.id).await;
        assert!(matches!(duplicate, Err(GatorError::Validation(_))));

        assert_eq!(repo.list_for_user(user_id).await.unwrap().len(), 1);
        assert!(repo.delete(user_id, feed.id).await.unwrap());
        assert!(!repo.delete(user_id, feed.id).await.unwrap());
        assert!(repo.list_for_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_posts_for_user() {
        let db = setup_db().await;
        let reader = create_test_user(&db, "reader").await;
        let feeds = FeedRepository::new(db.pool());
        let followed = feeds
            .create(&NewFeed::new("Followed", "https://a.example.com/feed", reader))
            .await
            .unwrap();
        let other = feeds
            .create(&NewFeed::new("Other", "https://b.example.com/feed", reader))
            .await
            .unwrap();
        FeedFollowRepository::new(db.pool())
            .create(reader, followed.id)
            .await
            .unwrap();

        let posts = PostRepository::new(db.pool());
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        posts
            .create(&NewPost::new(followed.id, "Old", "https://a.example.com/old").with_published_at(t0))
            .await
            .unwrap();
        posts
            .create(&NewPost::new(followed.id, "Undated", "https://a.example.com/undated"))
            .await
            .unwrap();
        posts
            .create(
                &NewPost::new(followed.id, "New", "https://a.example.com/new")
                    .with_published_at(t0 + Duration::days(1)),
            )
            .await
            .unwrap();
        posts
            .create(&NewPost::new(other.id, "Hidden", "https://b.example.com/hidden"))
            .await
            .unwrap();

        let listed = posts.list_for_user(reader, 10).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old", "Undated"]);
        assert_eq!(listed[0].feed_name, "Followed");

        let limited = posts.list_for_user(reader, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
