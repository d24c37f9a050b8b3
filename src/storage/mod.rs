//! Storage backends for finalized sessions.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use traits::{SessionStore, document_key};
