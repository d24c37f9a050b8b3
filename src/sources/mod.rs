//! File-save sources.
//!
//! A source delivers `(absolute path, full text)` for every save to the
//! handlers subscribed to it.

pub mod fs;
pub mod manual;

pub use fs::FsWatcher;
pub use manual::ManualSaveSource;

use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Receives each save as `(absolute path, full text)`.
pub type SaveHandler = Arc<dyn Fn(&Path, &str) + Send + Sync>;

/// Something that reports file saves.
pub trait SaveSource: Send + Sync {
    /// Start delivering saves to `handler`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot start watching.
    fn subscribe(&self, handler: SaveHandler) -> Result<Box<dyn Subscription>>;
}

/// A live subscription to a [`SaveSource`].
pub trait Subscription: Send {
    /// Stop delivery. Once this returns the handler is never called again.
    fn unsubscribe(self: Box<Self>);
}
