//! gator - a feed aggregator
//!
//! Users register syndication feeds; a single scheduler polls them one at a
//! time, least recently fetched first, and stores each new entry exactly once.

pub mod cli;
pub mod clock;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod rss;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{ErrorScope, GatorError, Result};
