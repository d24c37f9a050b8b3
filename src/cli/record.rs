//! `stint record` command implementation.

use crate::cli::open_store;
use crate::config::load_config;
use crate::core::{Session, SessionRecorder};
use crate::error::Result;
use crate::git::GitCli;
use crate::sources::FsWatcher;
use std::env;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Run the record command.
///
/// Records saves and commits in `workspace` (default: the current
/// directory) until Enter is pressed or stdin closes, then saves the
/// session and prints its stats.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, recording cannot
/// start, or the session cannot be saved.
pub fn run(workspace: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let workspace = match workspace {
        Some(dir) => dir,
        None => env::current_dir()?,
    };
    // Watcher events report canonical paths
    let workspace = workspace.canonicalize().unwrap_or(workspace);

    let recorder = SessionRecorder::new(
        Some(workspace.clone()),
        Arc::new(open_store(&config)),
        Arc::new(FsWatcher::new(&workspace)),
        Arc::new(GitCli::new(&workspace)),
        &config.recording,
    )?;

    let id = recorder.start()?;
    println!("Recording session {id}");
    println!("Workspace: {}", workspace.display());
    if !recorder.is_tracking_commits() {
        println!("Not a git repository; commits will not be tracked.");
    }
    println!("Press Enter to stop.");

    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        warn!(error = %e, "Could not read stdin; stopping");
    }

    let session = recorder.stop()?;
    println!("{}", format_summary(&session));

    Ok(())
}

fn format_summary(session: &Session) -> String {
    let mut lines = vec![format!("Saved session {}", session.id)];
    if let Some(repository) = &session.repository {
        lines.push(format!("  Repository:    {repository}"));
    }
    if let Some(stats) = &session.stats {
        lines.push(format!("  Duration:      {} min", stats.duration));
        lines.push(format!("  Files changed: {}", stats.files_changed));
        lines.push(format!("  Commits:       {}", stats.commits_count));
    }
    lines.join("\n")
}
