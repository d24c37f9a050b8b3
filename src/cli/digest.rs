//! `stint digest` command implementation.

use crate::cli::{find_session, open_store};
use crate::config::load_config;
use crate::error::Result;

/// Run the digest command.
///
/// Prints the content-free projection a summarizer consumes.
///
/// # Errors
///
/// Returns an error if the storage backend fails or the session is not found.
pub fn run(id: &str) -> Result<()> {
    let config = load_config()?;
    let session = find_session(&open_store(&config), id)?;

    let json = serde_json::to_string_pretty(&session.digest())?;
    println!("{json}");

    Ok(())
}
