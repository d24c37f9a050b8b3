//! `stint attach` command implementation.

use crate::cli::{find_session, open_store};
use crate::config::load_config;
use crate::core::Session;
use crate::error::Result;
use crate::storage::SessionStore;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// Run the attach command.
///
/// Reads a summarizer result from `summary_path` and stores it on the
/// session.
///
/// # Errors
///
/// Returns an error if the file is unreadable or not JSON, the session is
/// not found, or the store fails.
pub fn run(id: &str, summary_path: &Path) -> Result<()> {
    let config = load_config()?;
    let contents = fs::read_to_string(summary_path)?;
    let summary: Value = serde_json::from_str(&contents)?;

    let session = attach_summary(&open_store(&config), id, summary)?;
    println!("Attached summary to session {}.", session.id);

    Ok(())
}

/// Replace the stored session's summary and save it in place.
fn attach_summary(store: &dyn SessionStore, id: &str, summary: Value) -> Result<Session> {
    let mut session = find_session(store, id)?;
    session.summary = Some(summary);
    let key = store.save(&session)?;
    info!(session_id = %session.id, key = %key, "Attached summary");
    Ok(session)
}
