//! Repository inspector backed by the `git` executable.

use crate::error::{Error, Result};
use crate::git::{CommitInfo, RepositoryInspector};
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Field separator in `git log` output.
const FIELD_SEP: char = '\u{1f}';

/// Record separator in `git log` output.
const RECORD_SEP: char = '\u{1e}';

/// Runs `git -C <root> ...` for each query.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Inspect the repository containing `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run(&self, args: &[&str]) -> io::Result<Output> {
        Command::new("git").arg("-C").arg(&self.root).args(args).output()
    }

    /// Run a git command that must succeed and return its stdout.
    fn run_checked(&self, args: &[&str]) -> Result<String> {
        let output = self
            .run(args)
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn has_commits(&self) -> Result<bool> {
        let output = self
            .run(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;
        Ok(output.status.success())
    }
}

impl RepositoryInspector for GitCli {
    fn root(&self) -> &Path {
        &self.root
    }

    fn check_is_repo(&self) -> Result<bool> {
        match self.run(&["rev-parse", "--is-inside-work-tree"]) {
            Ok(output) => Ok(output.status.success()
                && String::from_utf8_lossy(&output.stdout).trim() == "true"),
            Err(e) => Err(Error::RepositoryUnavailable(format!(
                "git is not available: {e}"
            ))),
        }
    }

    fn fetch_url(&self) -> Result<Option<String>> {
        let stdout = self.run_checked(&["remote", "-v"])?;
        Ok(parse_fetch_url(&stdout))
    }

    fn log(&self, max_count: usize) -> Result<Vec<CommitInfo>> {
        // An unborn HEAD makes `git log` fail; that is an empty history
        if !self.has_commits()? {
            return Ok(Vec::new());
        }

        let count = max_count.to_string();
        let stdout = self.run_checked(&[
            "log",
            "-n",
            &count,
            "--format=%H%x1f%an%x1f%cI%x1f%s%x1e",
        ])?;
        parse_log(&stdout)
    }
}

/// Pick `origin`'s fetch URL, else the first fetch URL.
fn parse_fetch_url(remote_output: &str) -> Option<String> {
    let fetch_urls: Vec<(&str, &str)> = remote_output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let url = parts.next()?;
            (parts.next()? == "(fetch)").then_some((name, url))
        })
        .collect();

    fetch_urls
        .iter()
        .find(|(name, _)| *name == "origin")
        .or_else(|| fetch_urls.first())
        .map(|(_, url)| (*url).to_string())
}

fn parse_log(stdout: &str) -> Result<Vec<CommitInfo>> {
    stdout
        .split(RECORD_SEP)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<CommitInfo> {
    let fields: Vec<&str> = record.splitn(4, FIELD_SEP).collect();
    let [hash, author, date, message] = fields.as_slice() else {
        return Err(Error::Git(format!("unexpected log record: {record:?}")));
    };

    let date = DateTime::parse_from_rfc3339(date)
        .map_err(|e| Error::Git(format!("bad commit date {date:?}: {e}")))?
        .with_timezone(&Utc);

    Ok(CommitInfo {
        hash: (*hash).to_string(),
        message: (*message).to_string(),
        author: (*author).to_string(),
        date,
    })
}
