//! Error types for gator.

use thiserror::Error;

/// Common error type for gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant with their message.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad command-line arguments.
    #[error("usage: {0}")]
    Usage(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The feed set is empty, so there is nothing to select.
    #[error("no feeds registered")]
    NoFeedsRegistered,

    /// Connection, timeout, HTTP status or size-limit failure while fetching.
    #[error("network error: {0}")]
    Network(String),

    /// The payload is not a syndication document we can read.
    #[error("decode error: {0}")]
    Decode(String),

    /// The operation was interrupted by shutdown.
    #[error("cancelled")]
    Cancelled,
}

/// Where an error stops the work it interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// Fatal to the invoking command; reported to the user.
    Command,
    /// Aborts one ingestion cycle; the scheduler logs it and keeps going.
    Cycle,
    /// Expected outcome, nothing failed.
    Informational,
}

impl GatorError {
    /// Classify this error.
    pub fn scope(&self) -> ErrorScope {
        match self {
            GatorError::Usage(_)
            | GatorError::Validation(_)
            | GatorError::NotFound(_)
            | GatorError::Config(_)
            | GatorError::Io(_) => ErrorScope::Command,
            GatorError::Database(_)
            | GatorError::NoFeedsRegistered
            | GatorError::Network(_)
            | GatorError::Decode(_) => ErrorScope::Cycle,
            GatorError::Cancelled => ErrorScope::Informational,
        }
    }
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

/// Result type alias for gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
