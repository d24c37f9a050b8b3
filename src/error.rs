//! Error types for stint.

use std::io;
use thiserror::Error;

/// Result type alias for stint operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stint operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage I/O error.
    #[error("Storage error: {0}")]
    Storage(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Configuration error (missing workspace, bad config file, bad pattern).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The target is not a usable repository.
    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    /// A repository inspection command failed.
    #[error("Git error: {0}")]
    Git(String),

    /// A stored document could not be parsed.
    #[error("Corrupt record {key}: {reason}")]
    CorruptRecord {
        /// Document key.
        key: String,
        /// Parse failure.
        reason: String,
    },

    /// Start while recording, or stop while idle.
    #[error("Duplicate operation: {0}")]
    DuplicateOperation(String),

    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),
}
