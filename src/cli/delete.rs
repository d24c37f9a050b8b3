//! `stint delete` command implementation.

use crate::cli::{find_session, open_store};
use crate::config::load_config;
use crate::error::Result;
use crate::storage::SessionStore;
use uuid::Uuid;

/// Run the delete command.
///
/// # Errors
///
/// Returns an error if the storage backend fails or the session is not found.
pub fn run(id: &str) -> Result<()> {
    let config = load_config()?;
    let deleted = delete_session(&open_store(&config), id)?;
    println!("Deleted session {deleted}.");
    Ok(())
}

/// Delete a stored session, returning its id.
fn delete_session(store: &dyn SessionStore, id: &str) -> Result<Uuid> {
    let session = find_session(store, id)?;
    store.delete(id)?;
    Ok(session.id)
}
