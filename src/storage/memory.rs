//! In-memory storage backend for testing and embedding.

use crate::core::Session;
use crate::error::Result;
use crate::storage::traits::{SessionStore, document_key};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// In-memory storage backend. Same contract as the file backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sessions: RwLock<BTreeMap<String, Session>>,
    max_sessions: usize,
}

impl MemoryBackend {
    /// Create a new in-memory backend with retention disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_sessions` sessions. Zero disables retention.
    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions;
        self
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn find_key(sessions: &BTreeMap<String, Session>, id: &str) -> Option<String> {
    if sessions.contains_key(id) {
        return Some(id.to_string());
    }
    sessions
        .iter()
        .find(|(_, s)| s.id.to_string() == id)
        .map(|(k, _)| k.clone())
}

impl SessionStore for MemoryBackend {
    fn save(&self, session: &Session) -> Result<String> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let key = document_key(session);

        if self.max_sessions > 0 && !sessions.contains_key(&key) {
            while sessions.len() >= self.max_sessions {
                if sessions.pop_first().is_none() {
                    break;
                }
            }
        }

        sessions.insert(key.clone(), session.clone());
        Ok(key)
    }

    fn load(&self, id: &str) -> Result<Option<Session>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        Ok(find_key(&sessions, id).and_then(|k| sessions.get(&k).cloned()))
    }

    fn load_all(&self) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions.values().rev().cloned().collect())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = find_key(&sessions, id) {
            sessions.remove(&key);
        }
        Ok(())
    }
}
