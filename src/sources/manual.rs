//! Save source driven by the host.

use crate::error::Result;
use crate::sources::{SaveHandler, SaveSource, Subscription};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, SaveHandler)>,
}

/// A save source whose saves are pushed in with [`ManualSaveSource::emit`].
///
/// Used by editor integrations that already receive save notifications,
/// and by tests.
#[derive(Clone, Default)]
pub struct ManualSaveSource {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for ManualSaveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualSaveSource")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ManualSaveSource {
    /// Create a source with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a save to every subscriber. Returns how many were notified.
    pub fn emit(&self, path: impl AsRef<Path>, text: &str) -> usize {
        // Handlers run under the lock so unsubscribe waits for them
        let registry = lock(&self.registry);
        for (_, handler) in &registry.handlers {
            handler(path.as_ref(), text);
        }
        registry.handlers.len()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).handlers.len()
    }
}

impl SaveSource for ManualSaveSource {
    fn subscribe(&self, handler: SaveHandler) -> Result<Box<dyn Subscription>> {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, handler));

        Ok(Box::new(ManualSubscription {
            id,
            registry: Arc::clone(&self.registry),
        }))
    }
}

struct ManualSubscription {
    id: u64,
    registry: Arc<Mutex<Registry>>,
}

impl Subscription for ManualSubscription {
    fn unsubscribe(self: Box<Self>) {
        lock(&self.registry).handlers.retain(|(id, _)| *id != self.id);
    }
}
