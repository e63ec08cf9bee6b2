//! Error type for inbox operations.
//!
//! The conversation grouper never fails; these errors come from the store,
//! the message source, configuration and input validation.

use thiserror::Error;

/// Result type for inbox operations
pub type Result<T> = std::result::Result<T, InboxError>;

/// Errors that can occur while loading, storing or sending messages
#[derive(Error, Debug)]
pub enum InboxError {
    /// SQLite failure in the local message store
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system failure while opening the store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input rejected by validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// A user id that is empty, too long or contains control characters
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    /// Bad environment or file configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The message source failed to fetch, send or mark a message
    #[error("Message source error: {0}")]
    Source(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl<T> From<std::sync::PoisonError<T>> for InboxError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        InboxError::LockPoisoned
    }
}
