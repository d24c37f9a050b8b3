//! CLI command implementations.

pub mod attach;
pub mod delete;
pub mod digest;
pub mod export;
pub mod list;
pub mod record;
pub mod show;
pub mod timeline;

use crate::config::Config;
use crate::core::Session;
use crate::error::{Error, Result};
use crate::storage::{FileBackend, SessionStore};

/// Open the configured session store.
#[must_use]
pub fn open_store(config: &Config) -> FileBackend {
    FileBackend::new(config.storage.path.clone()).with_max_sessions(config.storage.max_sessions)
}

/// Load a stored session by key or id.
///
/// # Errors
///
/// Returns [`Error::SessionNotFound`] if nothing matches, or the store's
/// error if the lookup fails.
pub fn find_session(store: &dyn SessionStore, id: &str) -> Result<Session> {
    store
        .load(id)?
        .ok_or_else(|| Error::SessionNotFound(id.to_string()))
}

/// Short form of a commit hash for display.
pub(crate) fn short_hash(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}
