//! Session record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

/// A recorded working session, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Session identifier.
    #[serde(rename = "sessionId")]
    pub id: Uuid,

    /// When recording started.
    pub start_time: DateTime<Utc>,

    /// When recording stopped. Set exactly once, by [`Session::finalize`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Display name of the repository, if one was tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// File saves, in arrival order.
    #[serde(default)]
    pub changes: Vec<FileChangeEvent>,

    /// Commits, in arrival order (oldest first within each poll).
    #[serde(default)]
    pub commits: Vec<CommitEvent>,

    /// Summary statistics. Present iff the session is finalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SessionStats>,

    /// Externally produced summary, attached after the fact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Value>,
}

impl Session {
    /// Create a new, empty session starting at `start_time`.
    #[must_use]
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time: None,
            repository: None,
            changes: Vec::new(),
            commits: Vec::new(),
            stats: None,
            summary: None,
        }
    }

    /// Whether the session has been finalized.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }

    /// Set the end time and compute stats.
    ///
    /// Does nothing if the session is already finalized. An `end_time`
    /// earlier than `start_time` is clamped to `start_time`.
    pub fn finalize(&mut self, end_time: DateTime<Utc>) {
        if self.is_finalized() {
            return;
        }
        let end_time = end_time.max(self.start_time);
        self.end_time = Some(end_time);
        self.stats = Some(SessionStats::compute(self, end_time));
    }

    /// Merge changes and commits into one time-ordered view.
    ///
    /// The sort is stable: entries with equal timestamps keep arrival
    /// order, with file changes ahead of commits.
    #[must_use]
    pub fn timeline(&self) -> Vec<TimelineEntry<'_>> {
        let mut entries: Vec<TimelineEntry<'_>> = self
            .changes
            .iter()
            .map(TimelineEntry::Change)
            .chain(self.commits.iter().map(TimelineEntry::Commit))
            .collect();
        entries.sort_by_key(|entry| (entry.timestamp(), entry.rank()));
        entries
    }

    /// The content-free projection handed to a summarizer.
    #[must_use]
    pub fn digest(&self) -> SessionDigest {
        SessionDigest {
            repository: self.repository.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
            files: self
                .changes
                .iter()
                .map(|c| DigestFile {
                    file: c.file.clone(),
                    timestamp: c.timestamp,
                })
                .collect(),
            commits: self
                .commits
                .iter()
                .map(|c| DigestCommit {
                    message: c.message.clone(),
                    timestamp: c.timestamp,
                })
                .collect(),
        }
    }
}

/// A single file save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeEvent {
    /// Workspace-relative path with forward slashes.
    pub file: String,

    /// When the save was observed.
    pub timestamp: DateTime<Utc>,

    /// Full text of the file at save time.
    pub content: String,
}

/// A commit observed during the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    /// Full commit hash.
    pub hash: String,

    /// Commit subject line.
    pub message: String,

    /// Author name.
    pub author: String,

    /// Author date.
    pub timestamp: DateTime<Utc>,
}

/// Statistics computed when a session is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Number of distinct files saved.
    pub files_changed: usize,

    /// Number of commits observed.
    pub commits_count: usize,

    /// Session length in whole minutes, rounded.
    #[serde(with = "minutes_as_string")]
    pub duration: u64,
}

impl SessionStats {
    /// Compute stats for `session` as if it ended at `end_time`.
    #[must_use]
    pub fn compute(session: &Session, end_time: DateTime<Utc>) -> Self {
        let files: HashSet<&str> = session.changes.iter().map(|c| c.file.as_str()).collect();
        let millis = (end_time - session.start_time).num_milliseconds().max(0);
        let millis = u64::try_from(millis).unwrap_or(0);

        Self {
            files_changed: files.len(),
            commits_count: session.commits.len(),
            duration: (millis + 30_000) / 60_000,
        }
    }
}

/// One entry in a merged timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEntry<'a> {
    /// A file save.
    Change(&'a FileChangeEvent),

    /// A commit.
    Commit(&'a CommitEvent),
}

impl TimelineEntry<'_> {
    /// When the entry happened.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Change(c) => c.timestamp,
            Self::Commit(c) => c.timestamp,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Change(_) => 0,
            Self::Commit(_) => 1,
        }
    }
}

/// Reduced view of a session for summarization. Never carries file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDigest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub files: Vec<DigestFile>,
    pub commits: Vec<DigestCommit>,
}

/// A file save in a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestFile {
    pub file: String,
    pub timestamp: DateTime<Utc>,
}

/// A commit in a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestCommit {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Stats store the duration as a stringified integer.
mod minutes_as_string {
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(minutes: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&minutes.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.trim().parse().map_err(de::Error::custom),
            Repr::Number(n) => Ok(n),
        }
    }
}
