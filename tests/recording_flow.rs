//! Integration tests for the full recording flow.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use stint::config::RecordingConfig;
use stint::core::{ManualClock, RecorderState, Session, SessionRecorder, TimelineEntry};
use stint::error::Error;
use stint::git::MemoryRepository;
use stint::sources::ManualSaveSource;
use stint::storage::{FileBackend, SessionStore};
use tempfile::TempDir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

fn recording_config() -> RecordingConfig {
    RecordingConfig {
        poll_interval_seconds: 3600,
        ..RecordingConfig::default()
    }
}

struct Fixture {
    recorder: SessionRecorder,
    saves: ManualSaveSource,
    repo: Arc<MemoryRepository>,
    store: Arc<FileBackend>,
    clock: Arc<ManualClock>,
    workspace: TempDir,
    _storage: TempDir,
}

fn fixture(repo: MemoryRepository) -> Fixture {
    let workspace = TempDir::new().unwrap();
    let storage = TempDir::new().unwrap();
    let saves = ManualSaveSource::new();
    let repo = Arc::new(repo);
    let store = Arc::new(FileBackend::new(storage.path().to_path_buf()));
    let clock = Arc::new(ManualClock::new(t0()));

    let recorder = SessionRecorder::new(
        Some(workspace.path().to_path_buf()),
        store.clone(),
        Arc::new(saves.clone()),
        repo.clone(),
        &recording_config(),
    )
    .unwrap()
    .with_clock(clock.clone());

    Fixture {
        recorder,
        saves,
        repo,
        store,
        clock,
        workspace,
        _storage: storage,
    }
}

impl Fixture {
    fn save_at(&self, minutes: i64, file: &str, text: &str) {
        self.clock.set(t0() + Duration::minutes(minutes));
        self.saves.emit(self.workspace.path().join(file), text);
    }
}

#[test]
fn full_flow_saves_and_commit() {
    let repo = MemoryRepository::new("/work/widgets")
        .with_fetch_url("https://github.com/acme/widgets.git");
    repo.commit("base", "Initial commit", "Dev", t0() - Duration::hours(1));
    let f = fixture(repo);

    // Step 1: start at T0
    let id = f.recorder.start().unwrap();
    assert_eq!(f.recorder.state(), RecorderState::Recording);

    // Step 2: save, commit, save
    f.save_at(1, "a.ts", "let a = 1;");
    f.repo
        .commit("abc123", "Fix bug", "Ada", t0() + Duration::minutes(2));
    f.clock.set(t0() + Duration::minutes(2));
    assert_eq!(f.recorder.poll_commits_now().unwrap(), 1);
    f.save_at(3, "a.ts", "let a = 2;");

    // Step 3: stop at T0+5m
    f.clock.set(t0() + Duration::minutes(5));
    let session = f.recorder.stop().unwrap();
    assert_eq!(f.recorder.state(), RecorderState::Idle);

    assert_eq!(session.id, id);
    assert_eq!(session.repository.as_deref(), Some("widgets"));
    assert_eq!(session.changes.len(), 2);
    assert_eq!(session.commits.len(), 1);

    let value = serde_json::to_value(&session).unwrap();
    assert_eq!(
        value["stats"],
        json!({"filesChanged": 1, "commitsCount": 1, "duration": "5"})
    );

    let timeline = session.timeline();
    assert!(matches!(timeline[0], TimelineEntry::Change(c) if c.content == "let a = 1;"));
    assert!(matches!(timeline[1], TimelineEntry::Commit(c) if c.hash == "abc123"));
    assert!(matches!(timeline[2], TimelineEntry::Change(c) if c.content == "let a = 2;"));

    // Step 4: the stored document round-trips
    let stored = f.store.load(&id.to_string()).unwrap().unwrap();
    assert_eq!(stored, session);
}

#[test]
fn no_repository_records_saves_without_commits() {
    let f = fixture(MemoryRepository::not_a_repo("/work/plain"));

    f.recorder.start().unwrap();
    assert!(!f.recorder.is_tracking_commits());
    f.save_at(1, "notes.md", "# notes");
    assert_eq!(f.recorder.poll_commits_now().unwrap(), 0);
    f.clock.set(t0() + Duration::minutes(2));
    let session = f.recorder.stop().unwrap();

    assert!(session.repository.is_none());
    assert!(session.commits.is_empty());
    assert_eq!(session.changes.len(), 1);

    let stored = fs::read_to_string(
        f.store
            .sessions_dir()
            .join(format!("{}.json", stint::storage::document_key(&session))),
    )
    .unwrap();
    assert!(!stored.contains("\"repository\""));
}

#[test]
fn duplicate_start_keeps_first_session() {
    let f = fixture(MemoryRepository::new("/work/widgets"));

    let first = f.recorder.start().unwrap();
    f.clock.set(t0() + Duration::minutes(1));
    assert!(matches!(
        f.recorder.start(),
        Err(Error::DuplicateOperation(_))
    ));

    let session = f.recorder.stop().unwrap();
    assert_eq!(session.id, first);
    assert_eq!(session.start_time, t0());
    assert_eq!(f.store.load_all().unwrap().len(), 1);
}

#[test]
fn stop_while_idle_writes_nothing() {
    let f = fixture(MemoryRepository::new("/work/widgets"));

    assert!(matches!(
        f.recorder.stop(),
        Err(Error::DuplicateOperation(_))
    ));
    assert!(f.store.load_all().unwrap().is_empty());
    assert!(!f.store.sessions_dir().exists());
}

#[test]
fn load_all_skips_corrupt_documents() {
    let storage = TempDir::new().unwrap();
    let store = FileBackend::new(storage.path().to_path_buf());

    let mut older = Session::new(t0());
    older.finalize(t0() + Duration::minutes(10));
    let mut newer = Session::new(t0() + Duration::hours(1));
    newer.finalize(t0() + Duration::hours(2));
    store.save(&older).unwrap();
    store.save(&newer).unwrap();

    fs::write(
        store
            .sessions_dir()
            .join("session-2026-03-01T09-30-00-000Z.json"),
        "{ not json",
    )
    .unwrap();

    let sessions = store.load_all().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, newer.id);
    assert_eq!(sessions[1].id, older.id);

    assert!(matches!(
        store.load("session-2026-03-01T09-30-00-000Z"),
        Err(Error::CorruptRecord { .. })
    ));
}

#[test]
fn retention_evicts_oldest_on_new_save() {
    let storage = TempDir::new().unwrap();
    let store = FileBackend::new(storage.path().to_path_buf()).with_max_sessions(3);

    let sessions: Vec<Session> = (0..4)
        .map(|i| Session::new(t0() + Duration::hours(i)))
        .collect();
    for session in &sessions {
        store.save(session).unwrap();
    }

    let remaining = store.load_all().unwrap();
    assert_eq!(remaining.len(), 3);
    assert!(store.load(&sessions[0].id.to_string()).unwrap().is_none());
    assert_eq!(remaining[0].id, sessions[3].id);
}

#[test]
fn restarting_records_a_fresh_session() {
    let f = fixture(MemoryRepository::new("/work/widgets"));

    f.recorder.start().unwrap();
    f.save_at(1, "a.ts", "one");
    f.clock.set(t0() + Duration::minutes(2));
    let first = f.recorder.stop().unwrap();

    f.clock.set(t0() + Duration::minutes(10));
    f.recorder.start().unwrap();
    f.save_at(11, "b.ts", "two");
    f.clock.set(t0() + Duration::minutes(12));
    let second = f.recorder.stop().unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(second.changes.len(), 1);
    assert_eq!(second.changes[0].file, "b.ts");
    assert_eq!(f.saves.subscriber_count(), 0);

    let all = f.store.load_all().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id);
}
