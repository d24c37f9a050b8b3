//! Session model and recording logic.

pub mod clock;
pub mod ignore;
pub mod recorder;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ignore::IgnoreRules;
pub use recorder::{RecorderState, SessionRecorder};
pub use session::{
    CommitEvent, DigestCommit, DigestFile, FileChangeEvent, Session, SessionDigest, SessionStats,
    TimelineEntry,
};
