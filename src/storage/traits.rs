//! Storage trait definitions.

use crate::core::Session;
use crate::error::Result;
use chrono::SecondsFormat;

/// Prefix shared by every session document key.
pub const KEY_PREFIX: &str = "session-";

/// Storage backend for finalized sessions.
pub trait SessionStore: Send + Sync {
    /// Save a session, returning its document key.
    ///
    /// Re-saving a session overwrites its document. Saving a session that
    /// is not stored yet first applies the retention policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn save(&self, session: &Session) -> Result<String>;

    /// Load a session by document key or session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails or the document is
    /// corrupt.
    fn load(&self, id: &str) -> Result<Option<Session>>;

    /// Load every readable session, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage location cannot be listed.
    fn load_all(&self) -> Result<Vec<Session>>;

    /// Delete a session by document key or session id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn delete(&self, id: &str) -> Result<()>;
}

/// Document key for a session, derived from its start time.
///
/// Keys sort lexicographically in chronological order.
#[must_use]
pub fn document_key(session: &Session) -> String {
    let stamp = session
        .start_time
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{KEY_PREFIX}{stamp}")
}
