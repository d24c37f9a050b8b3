//! Session lifecycle: `Idle` → `Recording` → `Idle`.
//!
//! The recorder owns at most one active session. File saves and commits
//! arrive on their own threads and append to that session under a single
//! mutex. Stopping unsubscribes both sources before the session is
//! finalized and saved, so nothing can append to a persisted session.

use crate::config::RecordingConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::core::ignore::IgnoreRules;
use crate::core::session::{CommitEvent, FileChangeEvent, Session};
use crate::error::{Error, Result};
use crate::git::{CommitHandler, CommitWatcher, RepositoryInspector, WatcherOptions};
use crate::sources::{SaveHandler, SaveSource, Subscription};
use crate::storage::SessionStore;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Recorder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// No session is recording.
    Idle,

    /// A session is recording.
    Recording,
}

/// The session being recorded plus its live status.
struct ActiveSession {
    session: Session,
    touched: HashSet<String>,
}

impl ActiveSession {
    fn new(session: Session) -> Self {
        Self {
            session,
            touched: HashSet::new(),
        }
    }

    fn record_change(&mut self, file: String, content: String, now: DateTime<Utc>) {
        // Keep the sequence non-decreasing even if the wall clock steps back
        let floor = self
            .session
            .changes
            .last()
            .map_or(self.session.start_time, |c| c.timestamp);
        let timestamp = now.max(floor);

        self.touched.insert(file.clone());
        self.session.changes.push(FileChangeEvent {
            file,
            timestamp,
            content,
        });
    }

    fn record_commit(&mut self, mut commit: CommitEvent) {
        // Rewritten history can carry dates older than earlier commits
        if let Some(last) = self.session.commits.last() {
            commit.timestamp = commit.timestamp.max(last.timestamp);
        }
        self.session.commits.push(commit);
    }
}

/// Handles that feed the active session.
struct Sources {
    subscription: Box<dyn Subscription>,
    watcher: Option<CommitWatcher>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Records file saves and commits into one session at a time.
pub struct SessionRecorder {
    workspace: Option<PathBuf>,
    store: Arc<dyn SessionStore>,
    saves: Arc<dyn SaveSource>,
    inspector: Arc<dyn RepositoryInspector>,
    ignore: Arc<IgnoreRules>,
    clock: Arc<dyn Clock>,
    watcher_options: WatcherOptions,
    active: Arc<Mutex<Option<ActiveSession>>>,
    sources: Mutex<Option<Sources>>,
}

impl SessionRecorder {
    /// Build a recorder for `workspace`.
    ///
    /// Ignore patterns are compiled here, once.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an ignore pattern is invalid.
    pub fn new(
        workspace: Option<PathBuf>,
        store: Arc<dyn SessionStore>,
        saves: Arc<dyn SaveSource>,
        inspector: Arc<dyn RepositoryInspector>,
        config: &RecordingConfig,
    ) -> Result<Self> {
        Ok(Self {
            workspace,
            store,
            saves,
            inspector,
            ignore: Arc::new(IgnoreRules::compile(&config.ignore)?),
            clock: Arc::new(SystemClock),
            watcher_options: WatcherOptions {
                poll_interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
            },
            active: Arc::new(Mutex::new(None)),
            sources: Mutex::new(None),
        })
    }

    /// Use `clock` for session and save timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the commit polling settings.
    #[must_use]
    pub fn with_watcher_options(mut self, options: WatcherOptions) -> Self {
        self.watcher_options = options;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RecorderState {
        if lock(&self.sources).is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    /// Whether a session is recording.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state() == RecorderState::Recording
    }

    /// Whether commits are being tracked for the active session.
    #[must_use]
    pub fn is_tracking_commits(&self) -> bool {
        lock(&self.sources)
            .as_ref()
            .is_some_and(|s| s.watcher.is_some())
    }

    /// Distinct files saved so far in the active session.
    #[must_use]
    pub fn files_touched(&self) -> usize {
        lock(&self.active).as_ref().map_or(0, |a| a.touched.len())
    }

    /// Snapshot of the active session.
    #[must_use]
    pub fn active_session(&self) -> Option<Session> {
        lock(&self.active).as_ref().map(|a| a.session.clone())
    }

    /// Start recording a new session. Returns its id.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateOperation`] if a session is already recording.
    /// - [`Error::Config`] if there is no usable workspace.
    /// - Any error from subscribing to the save source.
    pub fn start(&self) -> Result<Uuid> {
        let mut sources = lock(&self.sources);
        if sources.is_some() {
            warn!("Recording already in progress; start ignored");
            return Err(Error::DuplicateOperation(
                "a session is already recording".to_string(),
            ));
        }

        let workspace = self
            .workspace
            .as_deref()
            .ok_or_else(|| Error::Config("no workspace folder is open".to_string()))?;
        if !workspace.is_dir() {
            return Err(Error::Config(format!(
                "workspace {} is not a directory",
                workspace.display()
            )));
        }

        let mut session = Session::new(self.clock.now());
        let session_id = session.id;

        let watcher =
            match CommitWatcher::initialize(Arc::clone(&self.inspector), self.watcher_options) {
                Ok(watcher) => {
                    session.repository = Some(watcher.repository().to_string());
                    Some(watcher)
                }
                Err(e) => {
                    info!(error = %e, "Recording without commit tracking");
                    None
                }
            };

        *lock(&self.active) = Some(ActiveSession::new(session));

        let handler = self.save_handler(session_id, workspace_roots(workspace));
        let subscription = match self.saves.subscribe(handler) {
            Ok(subscription) => subscription,
            Err(e) => {
                lock(&self.active).take();
                return Err(e);
            }
        };

        let watcher = watcher.and_then(|mut watcher| {
            match watcher.start_tracking(self.commit_handler(session_id)) {
                Ok(()) => Some(watcher),
                Err(e) => {
                    warn!(error = %e, "Commit tracking disabled");
                    if let Some(active) = lock(&self.active).as_mut() {
                        active.session.repository = None;
                    }
                    None
                }
            }
        });

        *sources = Some(Sources {
            subscription,
            watcher,
        });

        info!(session_id = %session_id, workspace = %workspace.display(), "Recording started");
        Ok(session_id)
    }

    /// Run one commit poll now. Returns the number of commits recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository query fails.
    pub fn poll_commits_now(&self) -> Result<usize> {
        let sources = lock(&self.sources);
        match sources.as_ref().and_then(|s| s.watcher.as_ref()) {
            Some(watcher) => watcher.poll_once(),
            None => Ok(0),
        }
    }

    /// Stop recording, finalize the session, and save it.
    ///
    /// The recorder is `Idle` when this returns, whether or not the save
    /// succeeded.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateOperation`] if no session is recording.
    /// - The store's error if the session could not be saved.
    pub fn stop(&self) -> Result<Session> {
        let mut sources = lock(&self.sources);
        let Some(Sources {
            subscription,
            watcher,
        }) = sources.take()
        else {
            warn!("No session is recording; stop ignored");
            return Err(Error::DuplicateOperation(
                "no session is recording".to_string(),
            ));
        };

        // Both sources are silent before the session is finalized
        subscription.unsubscribe();
        if let Some(mut watcher) = watcher {
            watcher.stop_tracking();
        }

        let active = lock(&self.active).take();
        drop(sources);

        let Some(ActiveSession { mut session, .. }) = active else {
            return Err(Error::DuplicateOperation(
                "no session is recording".to_string(),
            ));
        };
        session.finalize(self.clock.now());

        match self.store.save(&session) {
            Ok(key) => {
                info!(
                    session_id = %session.id,
                    key = %key,
                    changes = session.changes.len(),
                    commits = session.commits.len(),
                    "Recording stopped and saved"
                );
                Ok(session)
            }
            Err(e) => {
                error!(session_id = %session.id, error = %e, "Failed to save session");
                Err(e)
            }
        }
    }

    /// Stop and save any active session, then release the recorder.
    ///
    /// Returns the outcome of the stop if a session was recording.
    pub fn dispose(self) -> Option<Result<Session>> {
        if self.is_recording() {
            Some(self.stop())
        } else {
            None
        }
    }

    fn save_handler(&self, session_id: Uuid, roots: Vec<PathBuf>) -> SaveHandler {
        let active = Arc::clone(&self.active);
        let ignore = Arc::clone(&self.ignore);
        let clock = Arc::clone(&self.clock);

        Arc::new(move |path: &Path, text: &str| {
            let Some(file) = roots.iter().find_map(|root| relative_path(root, path)) else {
                trace!(path = %path.display(), "Save outside workspace");
                return;
            };
            if ignore.is_ignored(&file) {
                trace!(file = %file, "Ignored save");
                return;
            }

            let mut guard = lock(&active);
            match guard.as_mut() {
                Some(current) if current.session.id == session_id => {
                    let now = clock.now();
                    current.record_change(file, text.to_string(), now);
                }
                _ => debug!(file = %file, "Dropping save for a finished session"),
            }
        })
    }

    fn commit_handler(&self, session_id: Uuid) -> CommitHandler {
        let active = Arc::clone(&self.active);

        Arc::new(move |commit: CommitEvent| {
            let mut guard = lock(&active);
            match guard.as_mut() {
                Some(current) if current.session.id == session_id => {
                    current.record_commit(commit);
                }
                _ => debug!(hash = %commit.hash, "Dropping commit for a finished session"),
            }
        })
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        let sources = self
            .sources
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Sources {
            subscription,
            watcher,
        }) = sources
        {
            subscription.unsubscribe();
            drop(watcher);
            warn!("Recorder dropped while recording; unsaved session discarded");
        }
    }
}

/// The workspace as given, plus its canonical form when that differs.
fn workspace_roots(workspace: &Path) -> Vec<PathBuf> {
    let mut roots = vec![workspace.to_path_buf()];
    if let Ok(canonical) = workspace.canonicalize() {
        if canonical != workspace {
            roots.push(canonical);
        }
    }
    roots
}

/// `path` relative to `root`, joined with forward slashes.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
