//! `stint timeline` command implementation.

use crate::cli::{find_session, open_store, short_hash};
use crate::config::load_config;
use crate::core::{Session, TimelineEntry};
use crate::error::Result;

/// Run the timeline command.
///
/// Shows saves and commits merged in time order.
///
/// # Errors
///
/// Returns an error if the storage backend fails or the session is not found.
pub fn run(id: &str) -> Result<()> {
    let config = load_config()?;
    let session = find_session(&open_store(&config), id)?;

    println!("Session: {}", session.id);
    if let Some(repository) = &session.repository {
        println!("Repository: {repository}");
    }
    println!("Started: {}", session.start_time.format("%Y-%m-%dT%H:%M:%SZ"));
    if let Some(end) = session.end_time {
        println!("Ended: {}", end.format("%Y-%m-%dT%H:%M:%SZ"));
    }
    println!();

    let lines = render_timeline(&session);
    if lines.is_empty() {
        println!("No activity recorded.");
    }
    for line in lines {
        println!("{line}");
    }

    Ok(())
}

/// One line per timeline entry.
fn render_timeline(session: &Session) -> Vec<String> {
    session
        .timeline()
        .into_iter()
        .map(|entry| {
            let time = entry.timestamp().format("%H:%M:%S");
            match entry {
                TimelineEntry::Change(change) => format!("{time}  save    {}", change.file),
                TimelineEntry::Commit(commit) => format!(
                    "{time}  commit  {} {} ({})",
                    short_hash(&commit.hash),
                    commit.message,
                    commit.author
                ),
            }
        })
        .collect()
}
