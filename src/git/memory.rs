//! In-memory repository for testing and embedding.

use crate::error::{Error, Result};
use crate::git::{CommitInfo, RepositoryInspector};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// A scripted repository whose history is appended to by hand.
#[derive(Debug)]
pub struct MemoryRepository {
    root: PathBuf,
    fetch_url: Option<String>,
    is_repo: AtomicBool,
    failing: AtomicBool,
    log_calls: AtomicUsize,
    /// Oldest first.
    history: Mutex<Vec<CommitInfo>>,
    /// Armed by [`MemoryRepository::pause_next_log`].
    pause: Mutex<Option<(Sender<()>, Receiver<()>)>>,
}

/// Holds one `log` call open until released or dropped.
#[derive(Debug)]
pub struct LogPause {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl LogPause {
    /// Wait until the paused `log` call has started.
    ///
    /// Returns `false` if no call started within `timeout`.
    #[must_use]
    pub fn wait_until_entered(&self, timeout: Duration) -> bool {
        self.entered.recv_timeout(timeout).is_ok()
    }

    /// Let the paused call finish.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

impl MemoryRepository {
    /// An empty repository rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fetch_url: None,
            is_repo: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            log_calls: AtomicUsize::new(0),
            history: Mutex::new(Vec::new()),
            pause: Mutex::new(None),
        }
    }

    /// A directory that is not a repository.
    #[must_use]
    pub fn not_a_repo(root: impl Into<PathBuf>) -> Self {
        let repo = Self::new(root);
        repo.is_repo.store(false, Ordering::SeqCst);
        repo
    }

    /// Set the remote fetch URL.
    #[must_use]
    pub fn with_fetch_url(mut self, url: impl Into<String>) -> Self {
        self.fetch_url = Some(url.into());
        self
    }

    /// Append a commit to the history.
    pub fn commit(&self, hash: &str, message: &str, author: &str, date: DateTime<Utc>) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CommitInfo {
                hash: hash.to_string(),
                message: message.to_string(),
                author: author.to_string(),
                date,
            });
    }

    /// Make every query fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Block the next `log` call until the returned handle is released.
    #[must_use]
    pub fn pause_next_log(&self) -> LogPause {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.pause.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((entered_tx, release_rx));
        LogPause {
            entered: entered_rx,
            release: release_tx,
        }
    }

    /// How many times `log` has been called.
    #[must_use]
    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Git("simulated failure".to_string()));
        }
        Ok(())
    }
}

impl RepositoryInspector for MemoryRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn check_is_repo(&self) -> Result<bool> {
        self.check_failing()?;
        Ok(self.is_repo.load(Ordering::SeqCst))
    }

    fn fetch_url(&self) -> Result<Option<String>> {
        self.check_failing()?;
        Ok(self.fetch_url.clone())
    }

    fn log(&self, max_count: usize) -> Result<Vec<CommitInfo>> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        let pause = self
            .pause
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((entered, release)) = pause {
            let _ = entered.send(());
            let _ = release.recv();
        }
        self.check_failing()?;
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(history.iter().rev().take(max_count).cloned().collect())
    }
}
