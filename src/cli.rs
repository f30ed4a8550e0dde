//! Command-line surface for gator.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::clock::SystemClock;
use crate::config::Config;
use crate::datetime::format_utc_datetime;
use crate::db::{Database, NewUser, User, UserRepository};
use crate::rss::{
    validate_feed_url, FeedFollowRepository, FeedRepository, NewFeed, PostRepository, RssFetcher,
    Scheduler,
};
use crate::{GatorError, Result};

/// Posts shown by `browse` when no limit is given.
pub const DEFAULT_BROWSE_LIMIT: i64 = 2;

#[derive(Parser, Debug)]
#[clap(name = "gator", version, about = "Feed aggregator")]
pub struct Cli {
    /// Path to the configuration file
    #[clap(long, global = true, default_value = "gator.toml")]
    pub config: PathBuf,

    /// Act as this user instead of the configured one
    #[clap(long, global = true)]
    pub user: Option<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Create a user
    Register {
        /// User name
        name: String,
    },

    /// List users
    Users,

    /// Register a feed and follow it
    #[clap(name = "addfeed")]
    AddFeed {
        /// Display name
        name: String,
        /// Feed URL
        url: String,
    },

    /// List all feeds
    Feeds,

    /// Follow an already registered feed
    Follow {
        /// Feed URL
        url: String,
    },

    /// Stop following a feed
    Unfollow {
        /// Feed URL
        url: String,
    },

    /// List followed feeds
    Following,

    /// Poll feeds until interrupted
    Agg {
        /// Time between requests, e.g. 30s, 1m, 1h30m
        time_between_reqs: String,
    },

    /// Show the newest posts from followed feeds
    Browse {
        /// Number of posts to show
        #[clap(allow_negative_numbers = true)]
        limit: Option<i64>,
    },
}

/// Parse a duration such as `500ms`, `30s`, `1.5m` or `1h30m`.
///
/// Accepts the units `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`, with an
/// optional decimal fraction on each amount. Zero and out-of-range durations
/// are rejected.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let invalid = || GatorError::Usage(format!("invalid duration: {:?}", s));

    let mut total: u64 = 0;
    let mut rest = s.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit_nanos: u64 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3600 * 1_000_000_000,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        let whole: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut part = whole.checked_mul(unit_nanos).ok_or_else(invalid)?;

        // Digits past the 18th are below nanosecond precision for every unit
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        if !frac_digits.is_empty() {
            let numerator: u128 = frac_digits.parse().map_err(|_| invalid())?;
            let scale = 10u128.pow(frac_digits.len() as u32);
            let frac_nanos = u64::try_from(numerator * u128::from(unit_nanos) / scale)
                .map_err(|_| invalid())?;
            part = part.checked_add(frac_nanos).ok_or_else(invalid)?;
        }

        total = total.checked_add(part).ok_or_else(invalid)?;
    }

    if total == 0 {
        return Err(GatorError::Usage(format!("duration must be positive: {:?}", s)));
    }
    Ok(Duration::from_nanos(total))
}

/// Shared state for command handlers.
pub struct Context {
    pub config: Config,
    pub db: Arc<Database>,
}

impl Context {
    /// Open the configured database.
    pub async fn open(config: Config) -> Result<Self> {
        let db = Database::open(&config.database.path).await?;
        Ok(Self {
            config,
            db: Arc::new(db),
        })
    }

    /// Resolve the active user.
    pub async fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .session
            .current_user
            .as_deref()
            .ok_or_else(|| {
                GatorError::Usage("no current user; pass --user or set session.current_user".into())
            })?;

        UserRepository::new(self.db.pool())
            .get_by_name(name)
            .await?
            .ok_or_else(|| GatorError::NotFound(format!("user '{}'", name)))
    }
}

/// Run a command against an opened context, writing its output to `out`.
pub async fn execute<W: Write>(ctx: &Context, command: Commands, out: &mut W) -> Result<()> {
    match command {
        Commands::Register { name } => register(ctx, &name, out).await,
        Commands::Users => users(ctx, out).await,
        Commands::AddFeed { name, url } => add_feed(ctx, &name, &url, out).await,
        Commands::Feeds => feeds(ctx, out).await,
        Commands::Follow { url } => follow(ctx, &url, out).await,
        Commands::Unfollow { url } => unfollow(ctx, &url, out).await,
        Commands::Following => following(ctx, out).await,
        Commands::Agg { time_between_reqs } => agg(ctx, &time_between_reqs, out).await,
        Commands::Browse { limit } => browse(ctx, limit, out).await,
    }
}

async fn register<W: Write>(ctx: &Context, name: &str, out: &mut W) -> Result<()> {
    let user = UserRepository::new(ctx.db.pool())
        .create(&NewUser::new(name))
        .await?;
    info!(user_id = user.id, name = %user.name, "registered user");
    writeln!(out, "user {} created (id {})", user.name, user.id)?;
    Ok(())
}

async fn users<W: Write>(ctx: &Context, out: &mut W) -> Result<()> {
    let current = ctx.config.session.current_user.as_deref();
    for user in UserRepository::new(ctx.db.pool()).list().await? {
        if Some(user.name.as_str()) == current {
            writeln!(out, "* {} (current)", user.name)?;
        } else {
            writeln!(out, "* {}", user.name)?;
        }
    }
    Ok(())
}

async fn add_feed<W: Write>(ctx: &Context, name: &str, url: &str, out: &mut W) -> Result<()> {
    let user = ctx.current_user().await?;
    validate_feed_url(url, ctx.config.fetcher.allow_private_hosts)?;

    let feed = FeedRepository::new(ctx.db.pool())
        .create(&NewFeed::new(name, url, user.id))
        .await?;
    let follow = FeedFollowRepository::new(ctx.db.pool())
        .create(user.id, feed.id)
        .await?;

    info!(feed_id = feed.id, url = %feed.url, user = %user.name, "added feed");
    writeln!(out, "feed {} added ({})", feed.name, feed.url)?;
    writeln!(out, "{} is now following {}", follow.user_name, follow.feed_name)?;
    Ok(())
}

async fn feeds<W: Write>(ctx: &Context, out: &mut W) -> Result<()> {
    for entry in FeedRepository::new(ctx.db.pool()).list_with_owners().await? {
        writeln!(
            out,
            "{} {} {}",
            entry.feed.name, entry.feed.url, entry.owner_name
        )?;
    }
    Ok(())
}

async fn feed_by_url(ctx: &Context, url: &str) -> Result<crate::rss::Feed> {
    FeedRepository::new(ctx.db.pool())
        .get_by_url(url)
        .await?
        .ok_or_else(|| GatorError::NotFound(format!("feed {}", url)))
}

async fn follow<W: Write>(ctx: &Context, url: &str, out: &mut W) -> Result<()> {
    let user = ctx.current_user().await?;
    let feed = feed_by_url(ctx, url).await?;

    let follow = FeedFollowRepository::new(ctx.db.pool())
        .create(user.id, feed.id)
        .await?;
    writeln!(out, "{} is now following {}", follow.user_name, follow.feed_name)?;
    Ok(())
}

async fn unfollow<W: Write>(ctx: &Context, url: &str, out: &mut W) -> Result<()> {
    let user = ctx.current_user().await?;
    let feed = feed_by_url(ctx, url).await?;

    let removed = FeedFollowRepository::new(ctx.db.pool())
        .delete(user.id, feed.id)
        .await?;
    if !removed {
        return Err(GatorError::NotFound(format!(
            "follow of {} by {}",
            feed.url, user.name
        )));
    }
    writeln!(out, "{} unfollowed {}", user.name, feed.name)?;
    Ok(())
}

async fn following<W: Write>(ctx: &Context, out: &mut W) -> Result<()> {
    let user = ctx.current_user().await?;
    for follow in FeedFollowRepository::new(ctx.db.pool())
        .list_for_user(user.id)
        .await?
    {
        writeln!(out, "{}", follow.feed_name)?;
    }
    Ok(())
}

async fn agg<W: Write>(ctx: &Context, time_between_reqs: &str, out: &mut W) -> Result<()> {
    let period = parse_duration(time_between_reqs)?;
    let fetcher = RssFetcher::new(&ctx.config.fetcher)?;
    let scheduler = Scheduler::new(ctx.db.clone(), fetcher, SystemClock)
        .with_max_items(ctx.config.fetcher.max_items_per_feed);

    writeln!(out, "Collecting feeds every {}", time_between_reqs.trim())?;
    out.flush()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("received ctrl-c, shutting down");
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(period, shutdown_rx).await;
    Ok(())
}

async fn browse<W: Write>(ctx: &Context, limit: Option<i64>, out: &mut W) -> Result<()> {
    let limit = limit.unwrap_or(DEFAULT_BROWSE_LIMIT);
    if limit <= 0 {
        return Err(GatorError::Usage("limit must be greater than 0".into()));
    }

    let user = ctx.current_user().await?;
    let posts = PostRepository::new(ctx.db.pool())
        .list_for_user(user.id, limit as usize)
        .await?;

    let timezone = ctx.config.display.timezone.as_str();
    for entry in posts {
        let post = &entry.post;
        writeln!(out, "{}", post.title)?;
        match &post.published_at {
            Some(published) => writeln!(
                out,
                "From: {} | {}",
                entry.feed_name,
                format_utc_datetime(published, timezone, "%Y-%m-%d %H:%M")
            )?,
            None => writeln!(out, "From: {}", entry.feed_name)?,
        }
        writeln!(out, "{}", post.url)?;
        if let Some(description) = &post.description {
            writeln!(out, "{}", description)?;
        }
        writeln!(out, "-------------------------------------------")?;
    }
    Ok(())
}
