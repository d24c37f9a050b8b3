//! Repository inspection and commit tracking.

pub mod cli;
pub mod memory;
pub mod watcher;

pub use cli::GitCli;
pub use memory::{LogPause, MemoryRepository};
pub use watcher::{CommitHandler, CommitWatcher, WatcherOptions};

use crate::core::CommitEvent;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Number of commits fetched per poll.
///
/// More than this many commits between two polls means the oldest ones are
/// never observed.
pub const COMMIT_LOOKBACK: usize = 10;

/// A commit as reported by a repository inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full commit hash.
    pub hash: String,

    /// Subject line.
    pub message: String,

    /// Author name.
    pub author: String,

    /// Commit date (when the commit landed in this history).
    pub date: DateTime<Utc>,
}

impl From<CommitInfo> for CommitEvent {
    fn from(info: CommitInfo) -> Self {
        Self {
            hash: info.hash,
            message: info.message,
            author: info.author,
            timestamp: info.date,
        }
    }
}

/// Read-only view of a version-controlled directory.
pub trait RepositoryInspector: Send + Sync {
    /// Directory being inspected.
    fn root(&self) -> &Path;

    /// Whether the directory is inside a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the inspection tool cannot be run.
    fn check_is_repo(&self) -> Result<bool>;

    /// Fetch URL of the preferred remote, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the inspection tool fails.
    fn fetch_url(&self) -> Result<Option<String>>;

    /// The newest `max_count` commits, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the inspection tool fails.
    fn log(&self, max_count: usize) -> Result<Vec<CommitInfo>>;
}

/// Display name for a repository.
///
/// Uses the last path segment of the fetch URL without `.git`, falling
/// back to the directory name.
#[must_use]
pub fn repository_name(fetch_url: Option<&str>, root: &Path) -> String {
    let from_url = fetch_url.and_then(|url| {
        let trimmed = url.trim().trim_end_matches('/');
        let segment = trimmed.rsplit(['/', ':']).next()?;
        let name = segment.strip_suffix(".git").unwrap_or(segment);
        (!name.is_empty()).then(|| name.to_string())
    });

    from_url.unwrap_or_else(|| {
        root.file_name().map_or_else(
            || root.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        )
    })
}
