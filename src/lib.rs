//! stint - working session recorder.
//!
//! Records a bounded working interval from file saves and git commits,
//! merges them into one timeline, and stores the result as JSON for later
//! inspection and summarization.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod sources;
pub mod storage;

pub use config::Config;
pub use crate::core::{Session, SessionRecorder};
pub use error::{Error, Result};
