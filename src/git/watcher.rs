//! Commit polling with a checkpoint cursor.
//!
//! The watcher remembers the newest commit hash it has delivered (the
//! checkpoint). Each poll fetches the newest [`COMMIT_LOOKBACK`] commits,
//! takes everything newer than the checkpoint, and delivers those
//! oldest-first. A burst of more than [`COMMIT_LOOKBACK`] commits between
//! two polls loses the overflow.

use crate::core::CommitEvent;
use crate::error::{Error, Result};
use crate::git::{COMMIT_LOOKBACK, CommitInfo, RepositoryInspector, repository_name};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receives each newly observed commit.
pub type CommitHandler = Arc<dyn Fn(CommitEvent) + Send + Sync>;

/// Commit watcher settings.
#[derive(Debug, Clone, Copy)]
pub struct WatcherOptions {
    /// Time between polls.
    pub poll_interval: Duration,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// State shared with the timer thread.
struct Shared {
    inspector: Arc<dyn RepositoryInspector>,
    checkpoint: Mutex<Option<String>>,
    callback: Mutex<Option<CommitHandler>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn poll(&self) -> Result<usize> {
        // Held for the whole poll so polls never interleave
        let mut checkpoint = lock(&self.checkpoint);
        if lock(&self.callback).is_none() {
            return Ok(0);
        }

        let log = self.inspector.log(COMMIT_LOOKBACK).inspect_err(|e| {
            warn!(error = %e, "Commit poll failed; checkpoint unchanged");
        })?;
        let fresh = new_commits(&log, checkpoint.as_deref());

        // Tracking may have stopped while git was running
        let guard = lock(&self.callback);
        let Some(callback) = guard.as_ref() else {
            return Ok(0);
        };

        let count = fresh.len();
        for commit in fresh {
            debug!(hash = %commit.hash, "New commit");
            callback(commit.into());
        }

        if let Some(newest) = log.first() {
            *checkpoint = Some(newest.hash.clone());
        }
        Ok(count)
    }
}

struct Timer {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Detects commits made while a session is recording.
pub struct CommitWatcher {
    shared: Arc<Shared>,
    repository: String,
    options: WatcherOptions,
    timer: Option<Timer>,
}

impl std::fmt::Debug for CommitWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitWatcher")
            .field("repository", &self.repository)
            .field("checkpoint", &self.checkpoint())
            .field("tracking", &self.is_tracking())
            .finish_non_exhaustive()
    }
}

impl CommitWatcher {
    /// Prepare to watch the repository behind `inspector`.
    ///
    /// The checkpoint starts at the current newest commit, so history from
    /// before the session is never delivered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepositoryUnavailable`] if the target is not a
    /// repository or cannot be inspected.
    pub fn initialize(
        inspector: Arc<dyn RepositoryInspector>,
        options: WatcherOptions,
    ) -> Result<Self> {
        match inspector.check_is_repo() {
            Ok(true) => {}
            Ok(false) => {
                return Err(Error::RepositoryUnavailable(format!(
                    "{} is not a git repository",
                    inspector.root().display()
                )));
            }
            Err(e) => return Err(unavailable(e)),
        }

        let fetch_url = inspector.fetch_url().unwrap_or_else(|e| {
            debug!(error = %e, "No remote URL; naming repository after its directory");
            None
        });
        let repository = repository_name(fetch_url.as_deref(), inspector.root());

        let checkpoint = inspector
            .log(1)
            .map_err(unavailable)?
            .into_iter()
            .next()
            .map(|c| c.hash);

        info!(repository = %repository, checkpoint = ?checkpoint, "Commit watcher initialized");

        Ok(Self {
            shared: Arc::new(Shared {
                inspector,
                checkpoint: Mutex::new(checkpoint),
                callback: Mutex::new(None),
            }),
            repository,
            options,
            timer: None,
        })
    }

    /// Display name of the repository.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Hash of the newest delivered (or pre-existing) commit.
    #[must_use]
    pub fn checkpoint(&self) -> Option<String> {
        lock(&self.shared.checkpoint).clone()
    }

    /// Whether the timer is running.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.timer.is_some()
    }

    /// Deliver new commits to `callback`, polling every interval until
    /// [`stop_tracking`](Self::stop_tracking).
    ///
    /// # Errors
    ///
    /// Returns an error if the timer thread cannot be spawned.
    pub fn start_tracking(&mut self, callback: CommitHandler) -> Result<()> {
        self.stop_tracking();
        *lock(&self.shared.callback) = Some(callback);

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let shared = Arc::clone(&self.shared);
        let interval = self.options.poll_interval;

        let spawned = thread::Builder::new()
            .name("stint-commit-poll".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            // Failures are logged inside; the next tick retries
                            let _ = shared.poll();
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                self.timer = Some(Timer { stop_tx, handle });
                Ok(())
            }
            Err(e) => {
                lock(&self.shared.callback).take();
                Err(Error::RepositoryUnavailable(format!(
                    "cannot start commit polling: {e}"
                )))
            }
        }
    }

    /// Run one poll now. Returns the number of commits delivered.
    ///
    /// Does nothing while not tracking.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository query fails; the checkpoint is
    /// left untouched.
    pub fn poll_once(&self) -> Result<usize> {
        self.shared.poll()
    }

    /// Stop polling. Once this returns the callback is never invoked again.
    pub fn stop_tracking(&mut self) {
        // Waits for an in-flight delivery to finish
        lock(&self.shared.callback).take();

        if let Some(timer) = self.timer.take() {
            let _ = timer.stop_tx.send(());
            if timer.handle.join().is_err() {
                warn!("Commit poll thread panicked");
            }
        }
    }
}

impl Drop for CommitWatcher {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}

fn unavailable(e: Error) -> Error {
    match e {
        Error::RepositoryUnavailable(_) => e,
        other => Error::RepositoryUnavailable(other.to_string()),
    }
}

/// Commits in `log` (newest first) that are newer than `checkpoint`,
/// oldest first.
///
/// A checkpoint missing from `log` means every entry is new.
#[must_use]
pub fn new_commits(log: &[CommitInfo], checkpoint: Option<&str>) -> Vec<CommitInfo> {
    let mut fresh: Vec<CommitInfo> = log
        .iter()
        .take_while(|c| Some(c.hash.as_str()) != checkpoint)
        .cloned()
        .collect();
    fresh.reverse();
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MemoryRepository;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use std::time::Instant;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    /// Timer that never fires on its own during a test.
    fn manual() -> WatcherOptions {
        WatcherOptions {
            poll_interval: Duration::from_secs(3600),
        }
    }

    fn collector() -> (CommitHandler, Arc<Mutex<Vec<CommitEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: CommitHandler = Arc::new(move |commit| sink.lock().unwrap().push(commit));
        (handler, seen)
    }

    fn hashes(seen: &Arc<Mutex<Vec<CommitEvent>>>) -> Vec<String> {
        seen.lock().unwrap().iter().map(|c| c.hash.clone()).collect()
    }

    fn info(hash: &str) -> CommitInfo {
        CommitInfo {
            hash: hash.to_string(),
            message: String::new(),
            author: String::new(),
            date: at(0),
        }
    }

    #[test]
    fn not_a_repo_is_unavailable() {
        let repo = Arc::new(MemoryRepository::not_a_repo("/work/plain"));
        let err = CommitWatcher::initialize(repo, manual()).unwrap_err();
        assert!(matches!(err, Error::RepositoryUnavailable(_)));
    }

    #[test]
    fn inspection_failure_is_unavailable() {
        let repo = MemoryRepository::new("/work/widgets");
        repo.set_failing(true);
        let err = CommitWatcher::initialize(Arc::new(repo), manual()).unwrap_err();
        assert!(matches!(err, Error::RepositoryUnavailable(_)));
    }

    #[test]
    fn initialize_names_repository_and_sets_checkpoint() {
        let repo = MemoryRepository::new("/work/checkout")
            .with_fetch_url("https://github.com/acme/widgets.git");
        repo.commit("old1", "first", "Dev", at(-20));
        repo.commit("old2", "second", "Dev", at(-10));

        let watcher = CommitWatcher::initialize(Arc::new(repo), manual()).unwrap();
        assert_eq!(watcher.repository(), "widgets");
        assert_eq!(watcher.checkpoint().as_deref(), Some("old2"));
        assert!(!watcher.is_tracking());
    }

    #[test]
    fn empty_repository_has_no_checkpoint() {
        let repo = Arc::new(MemoryRepository::new("/work/fresh"));
        let watcher = CommitWatcher::initialize(repo, manual()).unwrap();
        assert_eq!(watcher.repository(), "fresh");
        assert_eq!(watcher.checkpoint(), None);
    }

    #[test]
    fn polls_without_new_commits_deliver_nothing() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        repo.commit("old", "before session", "Dev", at(-5));
        let mut watcher = CommitWatcher::initialize(repo, manual()).unwrap();
        let (handler, seen) = collector();
        watcher.start_tracking(handler).unwrap();

        for _ in 0..5 {
            assert_eq!(watcher.poll_once().unwrap(), 0);
        }
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(watcher.checkpoint().as_deref(), Some("old"));
    }

    #[test]
    fn one_new_commit_is_delivered_once() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        repo.commit("old", "before session", "Dev", at(-5));
        let mut watcher = CommitWatcher::initialize(repo.clone(), manual()).unwrap();
        let (handler, seen) = collector();
        watcher.start_tracking(handler).unwrap();

        repo.commit("abc123", "Fix bug", "Ada", at(2));
        assert_eq!(watcher.poll_once().unwrap(), 1);
        assert_eq!(watcher.poll_once().unwrap(), 0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].hash, "abc123");
        assert_eq!(seen[0].message, "Fix bug");
        assert_eq!(seen[0].author, "Ada");
        assert_eq!(seen[0].timestamp, at(2));
        drop(seen);
        assert_eq!(watcher.checkpoint().as_deref(), Some("abc123"));
    }

    #[test]
    fn new_commits_are_delivered_oldest_first() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        let mut watcher = CommitWatcher::initialize(repo.clone(), manual()).unwrap();
        let (handler, seen) = collector();
        watcher.start_tracking(handler).unwrap();

        repo.commit("c1", "one", "Dev", at(1));
        repo.commit("c2", "two", "Dev", at(2));
        repo.commit("c3", "three", "Dev", at(3));
        assert_eq!(watcher.poll_once().unwrap(), 3);

        assert_eq!(hashes(&seen), vec!["c1", "c2", "c3"]);
        assert_eq!(watcher.checkpoint().as_deref(), Some("c3"));
    }

    #[test]
    fn burst_beyond_lookback_loses_the_oldest() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        repo.commit("base", "before session", "Dev", at(0));
        let mut watcher = CommitWatcher::initialize(repo.clone(), manual()).unwrap();
        let (handler, seen) = collector();
        watcher.start_tracking(handler).unwrap();

        for i in 0..12 {
            repo.commit(&format!("b{i:02}"), "burst", "Dev", at(1));
        }
        assert_eq!(watcher.poll_once().unwrap(), COMMIT_LOOKBACK);

        let delivered = hashes(&seen);
        assert_eq!(delivered.first().map(String::as_str), Some("b02"));
        assert_eq!(delivered.last().map(String::as_str), Some("b11"));
        assert!(!delivered.contains(&"b00".to_string()));
    }

    #[test]
    fn failed_poll_keeps_checkpoint_and_retries() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        repo.commit("old", "before session", "Dev", at(0));
        let mut watcher = CommitWatcher::initialize(repo.clone(), manual()).unwrap();
        let (handler, seen) = collector();
        watcher.start_tracking(handler).unwrap();

        repo.commit("new", "during session", "Dev", at(1));
        repo.set_failing(true);
        assert!(watcher.poll_once().is_err());
        assert!(watcher.poll_once().is_err());
        assert_eq!(watcher.checkpoint().as_deref(), Some("old"));

        repo.set_failing(false);
        assert_eq!(watcher.poll_once().unwrap(), 1);
        assert_eq!(hashes(&seen), vec!["new"]);
    }

    #[test]
    fn poll_without_tracking_does_nothing() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        let watcher = CommitWatcher::initialize(repo.clone(), manual()).unwrap();
        repo.commit("c1", "one", "Dev", at(1));

        assert_eq!(watcher.poll_once().unwrap(), 0);
        assert_eq!(watcher.checkpoint(), None);
        assert_eq!(repo.log_calls(), 1); // only the initial checkpoint lookup
    }

    #[test]
    fn stopped_watcher_never_calls_back() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        let mut watcher = CommitWatcher::initialize(repo.clone(), manual()).unwrap();
        let (handler, seen) = collector();
        watcher.start_tracking(handler).unwrap();
        watcher.stop_tracking();
        watcher.stop_tracking(); // idempotent

        repo.commit("late", "after stop", "Dev", at(1));
        assert_eq!(watcher.poll_once().unwrap(), 0);
        assert!(seen.lock().unwrap().is_empty());
        assert!(!watcher.is_tracking());
    }

    #[test]
    fn poll_in_flight_during_stop_never_calls_back() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        repo.commit("old", "before session", "Dev", at(0));
        let mut watcher = CommitWatcher::initialize(
            repo.clone(),
            WatcherOptions {
                poll_interval: Duration::from_millis(10),
            },
        )
        .unwrap();
        let shared = Arc::clone(&watcher.shared);
        let (handler, seen) = collector();

        repo.commit("racing", "lands mid-poll", "Dev", at(1));
        let pause = repo.pause_next_log();
        watcher.start_tracking(handler).unwrap();
        assert!(pause.wait_until_entered(Duration::from_secs(5)));

        let stopper = thread::spawn(move || {
            watcher.stop_tracking();
            watcher
        });

        // The callback is cleared before stop waits on the timer thread
        let deadline = Instant::now() + Duration::from_secs(5);
        while lock(&shared.callback).is_some() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(lock(&shared.callback).is_none());
        pause.release();

        let watcher = stopper.join().unwrap();
        assert!(!watcher.is_tracking());
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(watcher.checkpoint().as_deref(), Some("old"));
    }

    #[test]
    fn timer_polls_on_its_own() {
        let repo = Arc::new(MemoryRepository::new("/work/widgets"));
        let mut watcher = CommitWatcher::initialize(
            repo.clone(),
            WatcherOptions {
                poll_interval: Duration::from_millis(10),
            },
        )
        .unwrap();
        let (handler, seen) = collector();
        watcher.start_tracking(handler).unwrap();
        repo.commit("tick", "picked up by timer", "Dev", at(1));

        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.lock().unwrap().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        watcher.stop_tracking();

        assert_eq!(hashes(&seen), vec!["tick"]);
    }

    #[test]
    fn missing_checkpoint_treats_window_as_new() {
        let log = vec![info("c3"), info("c2"), info("c1")];
        let fresh = new_commits(&log, Some("gone"));
        let hashes: Vec<_> = fresh.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec!["c1", "c2", "c3"]);
    }

    proptest! {
        #[test]
        fn new_commits_is_reversed_prefix_before_checkpoint(
            len in 0usize..=COMMIT_LOOKBACK,
            cut in 0usize..=COMMIT_LOOKBACK,
        ) {
            // log is newest first: h{len-1} .. h0
            let log: Vec<CommitInfo> = (0..len).rev().map(|i| info(&format!("h{i}"))).collect();
            let checkpoint = (cut < len).then(|| format!("h{cut}"));

            let fresh = new_commits(&log, checkpoint.as_deref());

            let expected: Vec<String> = match checkpoint {
                Some(_) => (cut + 1..len).map(|i| format!("h{i}")).collect(),
                None => (0..len).map(|i| format!("h{i}")).collect(),
            };
            let got: Vec<String> = fresh.into_iter().map(|c| c.hash).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
