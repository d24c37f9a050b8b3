//! Save source backed by a recursive filesystem watcher.

use crate::error::{Error, Result};
use crate::sources::{SaveHandler, SaveSource, Subscription};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// How often the delivery thread checks for shutdown while idle.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Watches a directory tree and reports files whose contents were written.
#[derive(Debug, Clone)]
pub struct FsWatcher {
    root: PathBuf,
}

impl FsWatcher {
    /// Watch everything under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Whether an event means a file's contents may have changed.
fn is_save(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Modify(
                ModifyKind::Data(_)
                    | ModifyKind::Any
                    | ModifyKind::Name(RenameMode::To | RenameMode::Both)
            )
    )
}

fn deliver(event: &Event, handler: &SaveHandler, active: &AtomicBool) {
    if !is_save(&event.kind) {
        return;
    }
    for path in &event.paths {
        if !active.load(Ordering::SeqCst) {
            return;
        }
        // Rename sources and deleted files no longer exist
        if !path.is_file() {
            continue;
        }
        match fs::read_to_string(path) {
            Ok(text) => handler(path.as_path(), &text),
            Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable save"),
        }
    }
}

impl SaveSource for FsWatcher {
    fn subscribe(&self, handler: SaveHandler) -> Result<Box<dyn Subscription>> {
        let (tx, rx) = mpsc::channel();

        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            })
            .map_err(|e| Error::Config(format!("cannot create file watcher: {e}")))?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| {
                Error::Config(format!("cannot watch {}: {e}", self.root.display()))
            })?;

        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);

        let handle = thread::Builder::new()
            .name("stint-save-watch".to_string())
            .spawn(move || {
                loop {
                    match rx.recv_timeout(SHUTDOWN_POLL) {
                        Ok(event) => {
                            if !flag.load(Ordering::SeqCst) {
                                break;
                            }
                            deliver(&event, &handler, &flag);
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if !flag.load(Ordering::SeqCst) {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(Box::new(FsSubscription {
            watcher: Some(watcher),
            active,
            handle: Some(handle),
        }))
    }
}

struct FsSubscription {
    watcher: Option<RecommendedWatcher>,
    active: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FsSubscription {
    fn shutdown(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        drop(self.watcher.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Save watcher thread panicked");
            }
        }
    }
}

impl Subscription for FsSubscription {
    fn unsubscribe(mut self: Box<Self>) {
        self.shutdown();
    }
}

impl Drop for FsSubscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::DataChange;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Instant;
    use tempfile::TempDir;

    #[test]
    fn classifies_save_events() {
        assert!(is_save(&EventKind::Create(CreateKind::File)));
        assert!(is_save(&EventKind::Modify(ModifyKind::Data(
            DataChange::Content
        ))));
        assert!(is_save(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(!is_save(&EventKind::Create(CreateKind::Folder)));
        assert!(!is_save(&EventKind::Modify(ModifyKind::Name(
            RenameMode::From
        ))));
        assert!(!is_save(&EventKind::Any));
    }

    #[test]
    fn deliver_skips_missing_files() {
        let temp = TempDir::new().unwrap();
        let present = temp.path().join("present.txt");
        fs::write(&present, "hello").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: SaveHandler = Arc::new(move |path: &Path, text: &str| {
            sink.lock()
                .unwrap()
                .push((path.to_path_buf(), text.to_string()));
        });

        let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any)))
            .add_path(temp.path().join("gone.txt"))
            .add_path(present.clone());
        deliver(&event, &handler, &AtomicBool::new(true));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (present, "hello".to_string()));
    }

    #[test]
    fn reports_written_file() {
        let temp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: SaveHandler = Arc::new(move |path: &Path, text: &str| {
            sink.lock()
                .unwrap()
                .push((path.to_path_buf(), text.to_string()));
        });

        let sub = FsWatcher::new(temp.path()).subscribe(handler).unwrap();
        fs::write(temp.path().join("a.ts"), "export const a = 1;\n").unwrap();

        let written = |seen: &Mutex<Vec<(PathBuf, String)>>| {
            seen.lock()
                .unwrap()
                .iter()
                .any(|(p, text)| p.ends_with("a.ts") && text == "export const a = 1;\n")
        };

        // The create event may be read before the write lands; wait for the content
        let deadline = Instant::now() + Duration::from_secs(5);
        while !written(seen.as_ref()) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        sub.unsubscribe();

        assert!(written(seen.as_ref()));
    }
}
