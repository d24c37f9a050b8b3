//! `stint list` command implementation.

use crate::cli::open_store;
use crate::config::load_config;
use crate::core::Session;
use crate::error::Result;
use crate::storage::SessionStore;
use chrono::{DateTime, Local, Utc};

/// Default number of sessions to show.
const DEFAULT_LIMIT: usize = 20;

/// Maximum length for repository names in the table.
const REPOSITORY_PREVIEW_LEN: usize = 24;

/// Run the list command.
///
/// Shows stored sessions, most recent first.
///
/// # Errors
///
/// Returns an error if the configuration or storage backend fails.
pub fn run(limit: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config);
    let sessions = recent_sessions(&store, limit.unwrap_or(DEFAULT_LIMIT))?;

    if sessions.is_empty() {
        println!("No sessions found.");
        println!("\nSessions are stored in: {}", store.sessions_dir().display());
        return Ok(());
    }

    println!(
        "{:<38} {:<17} {:>8} {:>6} {:>8}  Repository",
        "Session ID", "Started", "Minutes", "Files", "Commits"
    );
    println!("{}", "─".repeat(110));

    for session in &sessions {
        println!("{}", format_row(session));
    }

    println!("{}", "─".repeat(110));
    println!("Showing {} session(s)", sessions.len());

    Ok(())
}

/// The `limit` most recent sessions.
fn recent_sessions(store: &dyn SessionStore, limit: usize) -> Result<Vec<Session>> {
    let mut sessions = store.load_all()?;
    sessions.truncate(limit);
    Ok(sessions)
}

fn format_row(session: &Session) -> String {
    let (minutes, files, commits) = match &session.stats {
        Some(stats) => (
            stats.duration.to_string(),
            stats.files_changed.to_string(),
            stats.commits_count.to_string(),
        ),
        None => ("-".to_string(), "-".to_string(), "-".to_string()),
    };

    format!(
        "{:<38} {:<17} {:>8} {:>6} {:>8}  {}",
        session.id,
        format_local_time(session.start_time),
        minutes,
        files,
        commits,
        format_repository(session.repository.as_deref())
    )
}

/// Format UTC time as local time for display.
fn format_local_time(utc: DateTime<Utc>) -> String {
    let local: DateTime<Local> = utc.into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

fn format_repository(repository: Option<&str>) -> String {
    match repository {
        Some(name) if name.chars().count() > REPOSITORY_PREVIEW_LEN => {
            let head: String = name.chars().take(REPOSITORY_PREVIEW_LEN).collect();
            format!("{head}...")
        }
        Some(name) => name.to_string(),
        None => "(none)".to_string(),
    }
}
