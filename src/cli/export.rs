//! `stint export` command implementation.

use crate::cli::{find_session, open_store, short_hash};
use crate::config::load_config;
use crate::core::{Session, TimelineEntry};
use crate::error::Result;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Run the export command.
///
/// Writes a markdown report to `output`, or stdout when `None`.
///
/// # Errors
///
/// Returns an error if the session is not found or the report cannot be
/// written.
pub fn run(id: &str, output: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let session = find_session(&open_store(&config), id)?;
    let report = render_markdown(&session);

    match output {
        Some(path) => {
            fs::write(path, &report)?;
            println!("Wrote {}", path.display());
        }
        None => print!("{report}"),
    }

    Ok(())
}

/// Markdown report of a session. File contents are left out.
fn render_markdown(session: &Session) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Session {}\n", session.id);
    if let Some(repository) = &session.repository {
        let _ = writeln!(out, "- **Repository:** {repository}");
    }
    let _ = writeln!(out, "- **Started:** {}", session.start_time.to_rfc3339());
    if let Some(end) = session.end_time {
        let _ = writeln!(out, "- **Ended:** {}", end.to_rfc3339());
    }
    if let Some(stats) = &session.stats {
        let _ = writeln!(out, "- **Duration:** {} min", stats.duration);
        let _ = writeln!(out, "- **Files changed:** {}", stats.files_changed);
        let _ = writeln!(out, "- **Commits:** {}", stats.commits_count);
    }

    // Saves per file, in path order
    let mut saves: BTreeMap<&str, usize> = BTreeMap::new();
    for change in &session.changes {
        *saves.entry(change.file.as_str()).or_default() += 1;
    }
    if !saves.is_empty() {
        out.push_str("\n## Files\n\n");
        for (file, count) in &saves {
            let _ = writeln!(out, "- `{file}` ({count} save{})", plural(*count));
        }
    }

    if !session.commits.is_empty() {
        out.push_str("\n## Commits\n\n");
        for commit in &session.commits {
            let _ = writeln!(
                out,
                "- `{}` {} ({})",
                short_hash(&commit.hash),
                commit.message,
                commit.author
            );
        }
    }

    let timeline = session.timeline();
    if !timeline.is_empty() {
        out.push_str("\n## Timeline\n\n");
        out.push_str("| Time | Event | Detail |\n| --- | --- | --- |\n");
        for entry in timeline {
            let time = entry.timestamp().format("%H:%M:%S");
            let _ = match entry {
                TimelineEntry::Change(change) => {
                    writeln!(out, "| {time} | save | `{}` |", change.file)
                }
                TimelineEntry::Commit(commit) => writeln!(
                    out,
                    "| {time} | commit | `{}` {} |",
                    short_hash(&commit.hash),
                    escape_cell(&commit.message)
                ),
            };
        }
    }

    if let Some(summary) = &session.summary {
        out.push_str("\n## Summary\n\n");
        match summary.as_str() {
            Some(text) => {
                let _ = writeln!(out, "{text}");
            }
            None => {
                let pretty = serde_json::to_string_pretty(summary).unwrap_or_default();
                let _ = writeln!(out, "```json\n{pretty}\n```");
            }
        }
    }

    out
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
