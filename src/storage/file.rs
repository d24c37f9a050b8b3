//! File-based storage backend.

use crate::core::Session;
use crate::error::{Error, Result};
use crate::storage::traits::{KEY_PREFIX, SessionStore, document_key};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// File-based storage backend with atomic writes and bounded retention.
///
/// Each session is one pretty-printed JSON document under
/// `<base_dir>/sessions/`.
#[derive(Debug)]
pub struct FileBackend {
    base_dir: PathBuf,
    max_sessions: usize,
}

impl FileBackend {
    /// Create a new file backend with retention disabled.
    ///
    /// The sessions directory is created on the first save.
    #[must_use]
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            max_sessions: 0,
        }
    }

    /// Keep at most `max_sessions` documents. Zero disables retention.
    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// Directory holding session documents.
    #[must_use]
    pub fn sessions_dir(&self) -> PathBuf {
        self.base_dir.join("sessions")
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.sessions_dir().join(format!("{key}.json"))
    }

    /// Stored document keys, oldest first.
    fn stored_keys(&self) -> Result<Vec<String>> {
        let dir = self.sessions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            // Only session .json documents; .tmp files are in-flight writes
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if is_document_key(stem) {
                        keys.push(stem.to_string());
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn read_document(&self, key: &str) -> Result<Session> {
        let contents = fs::read_to_string(self.document_path(key))?;
        serde_json::from_str(&contents).map_err(|e| Error::CorruptRecord {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Resolve a document key or session id to an existing document key.
    fn resolve_key(&self, id: &str) -> Result<Option<String>> {
        if is_document_key(id) && self.document_path(id).exists() {
            return Ok(Some(id.to_string()));
        }

        for key in self.stored_keys()? {
            match self.read_document(&key) {
                Ok(session) if session.id.to_string() == id => return Ok(Some(key)),
                Ok(_) => {}
                Err(e) => debug!(key = %key, error = %e, "Skipping unreadable document"),
            }
        }
        Ok(None)
    }

    /// Delete the oldest documents until there is room for one more.
    fn enforce_retention(&self) -> Result<()> {
        if self.max_sessions == 0 {
            return Ok(());
        }

        let keys = self.stored_keys()?;
        if keys.len() < self.max_sessions {
            return Ok(());
        }

        let excess = keys.len() + 1 - self.max_sessions;
        for key in keys.iter().take(excess) {
            remove_if_exists(&self.document_path(key))?;
            info!(key = %key, "Evicted session by retention policy");
        }
        Ok(())
    }
}

impl SessionStore for FileBackend {
    fn save(&self, session: &Session) -> Result<String> {
        fs::create_dir_all(self.sessions_dir())?;

        let key = document_key(session);
        let path = self.document_path(&key);
        if !path.exists() {
            self.enforce_retention()?;
        }

        let temp = path.with_extension("tmp");
        let contents = serde_json::to_string_pretty(session)?;
        fs::write(&temp, &contents)?;

        // Atomic rename - a crash mid-write never leaves a truncated document
        fs::rename(&temp, &path)?;

        debug!(key = %key, session_id = %session.id, "Saved session");
        Ok(key)
    }

    fn load(&self, id: &str) -> Result<Option<Session>> {
        match self.resolve_key(id)? {
            Some(key) => self.read_document(&key).map(Some),
            None => Ok(None),
        }
    }

    fn load_all(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();

        // Most recent first
        for key in self.stored_keys()?.iter().rev() {
            match self.read_document(key) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable session"),
            }
        }

        Ok(sessions)
    }

    fn delete(&self, id: &str) -> Result<()> {
        if let Some(key) = self.resolve_key(id)? {
            remove_if_exists(&self.document_path(&key))?;
        }
        Ok(())
    }
}

fn is_document_key(id: &str) -> bool {
    id.starts_with(KEY_PREFIX) && !id.contains(['/', '\\']) && !id.contains("..")
}

fn remove_if_exists(path: &std::path::Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
