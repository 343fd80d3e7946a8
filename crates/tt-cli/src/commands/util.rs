//! Shared plumbing for CLI commands.

use std::sync::Arc;

use anyhow::{Context, Result};

use tt_core::{ActivityName, ActivitySession, Clock, PersistenceError};
use tt_db::Database;

use crate::Config;
use crate::controller::{Controller, TrackerStore};
use crate::session_file::SessionFile;

/// Opens the configured database, creating its directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Parses a user-supplied activity name.
pub fn parse_name(name: &str) -> Result<ActivityName> {
    ActivityName::new(name).context("invalid activity name")
}

/// Runs one foreground period: restores the saved session, applies `f`, and
/// writes the session back. The snapshot is written even when `f` fails, so
/// a stop whose commit failed stays retryable.
pub fn with_session<S, T>(
    store: &S,
    session_file: &SessionFile,
    clock: Arc<dyn Clock>,
    f: impl FnOnce(&mut Controller<'_, S>) -> Result<T>,
) -> Result<T>
where
    S: TrackerStore + ?Sized,
{
    let _lock = session_file.lock()?;
    let mut controller = foreground(store, session_file, clock)?;

    let result = f(&mut controller);

    let persisted = match controller.app_entered_background() {
        Some(snapshot) => session_file.save(&snapshot),
        None => session_file.clear(),
    };
    match (result, persisted) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
        (Err(e), Err(persist_err)) => {
            tracing::warn!(error = %persist_err, "failed to save session after command error");
            Err(e)
        }
    }
}

/// Restores the saved session and writes the stopped session to the file
/// before its record is committed. The caller holds the session lock.
fn foreground<'a, S>(
    store: &'a S,
    session_file: &'a SessionFile,
    clock: Arc<dyn Clock>,
) -> Result<Controller<'a, S>>
where
    S: TrackerStore + ?Sized,
{
    let snapshot = session_file.load()?;
    let mut controller = Controller::app_returned_foreground(store, clock, snapshot)
        .with_context(|| format!("invalid session in {}", session_file.path().display()))?;
    controller.set_checkpoint(move |snapshot| {
        session_file
            .save(snapshot)
            .map_err(|e| PersistenceError::with_source("failed to checkpoint stopped session", e))
    });
    Ok(controller)
}

/// Reads the saved session without changing it.
pub fn peek_session(session_file: &SessionFile, clock: Arc<dyn Clock>) -> Result<ActivitySession> {
    let _lock = session_file.lock()?;
    let session = match session_file.load()? {
        Some(snapshot) => ActivitySession::restore(clock, snapshot)
            .with_context(|| format!("invalid session in {}", session_file.path().display()))?,
        None => ActivitySession::new(clock),
    };
    Ok(session)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use tt_core::{ExportTimezone, HistoryStore, ManualClock, SessionState};

    use super::*;
    use crate::commands::status;
    use crate::commands::testing::FlakyStore;

    fn clock() -> Arc<ManualClock> {
        let start = DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Arc::new(ManualClock::new(start))
    }

    #[test]
    fn session_carries_across_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        let clock = clock();

        with_session(&db, &file, clock.clone(), |c| {
            c.activity_selected(parse_name("Reading")?)?;
            c.start()?;
            Ok(())
        })
        .unwrap();
        assert!(file.load().unwrap().is_some());

        clock.advance(Duration::seconds(90));
        let session = peek_session(&file, clock.clone()).unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.elapsed_secs(), 90);

        let record = with_session(&db, &file, clock.clone(), |c| Ok(c.stop_tapped()?)).unwrap();
        assert_eq!(record.duration_secs, 90);
        assert!(file.load().unwrap().is_none());
        assert_eq!(db.all_records().unwrap().len(), 1);
    }

    #[test]
    fn failed_command_still_saves_session() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        let clock = clock();

        let result: Result<()> = with_session(&db, &file, clock.clone(), |c| {
            c.activity_selected(parse_name("Reading")?)?;
            c.pause()?;
            Ok(())
        });
        assert!(result.is_err());

        let session = peek_session(&file, clock).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.activity().unwrap().name.as_str(), "Reading");
    }

    #[test]
    fn crash_after_commit_does_not_duplicate_record() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("tt.db")).unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        let clock = clock();

        with_session(&db, &file, clock.clone(), |c| {
            c.activity_selected(parse_name("Reading")?)?;
            c.start()?;
            Ok(())
        })
        .unwrap();
        clock.advance(Duration::seconds(60));

        // Commit, then die before the snapshot is cleared.
        let committed = {
            let _lock = file.lock().unwrap();
            let mut controller = foreground(&db, &file, clock.clone()).unwrap();
            controller.stop_tapped().unwrap()
        };
        let left_behind = file.load().unwrap().unwrap();
        assert_eq!(left_behind.state, SessionState::Stopped);
        assert_eq!(left_behind.uncommitted.as_ref(), Some(&committed));

        clock.advance(Duration::seconds(30));
        let record = with_session(&db, &file, clock.clone(), |c| Ok(c.stop_tapped()?)).unwrap();
        assert_eq!(record.id, committed.id);
        assert_eq!(record.duration_secs, 60);
        assert_eq!(db.all_records().unwrap(), vec![committed]);
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn unsaved_stop_is_restored_and_committed_later() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlakyStore::default();
        let file = SessionFile::new(dir.path().join("session.json"));
        let clock = clock();

        with_session(&store, &file, clock.clone(), |c| {
            c.activity_selected(parse_name("Reading")?)?;
            c.start()?;
            Ok(())
        })
        .unwrap();
        clock.advance(Duration::seconds(45));
        let failed = with_session(&store, &file, clock.clone(), |c| Ok(c.stop_tapped()?));
        assert!(failed.is_err());

        let saved = file.load().unwrap().unwrap();
        assert_eq!(saved.state, SessionState::Stopped);
        let pending = saved.uncommitted.clone().unwrap();
        assert_eq!(pending.duration_secs, 45);

        clock.advance(Duration::minutes(10));
        let session = peek_session(&file, clock.clone()).unwrap();
        assert_eq!(session.uncommitted(), Some(&pending));
        let mut out = Vec::new();
        status::run(&mut out, &session, ExportTimezone::Utc, false).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("State: stopped\n"), "status: {out}");
        assert!(out.contains("Not saved yet."), "status: {out}");

        store.recover();
        let record = with_session(&store, &file, clock, |c| Ok(c.stop_tapped()?)).unwrap();
        assert_eq!(record, pending);
        assert_eq!(store.all_records().unwrap(), vec![pending]);
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn parse_name_rejects_empty() {
        assert!(parse_name("").is_err());
        assert_eq!(parse_name("Deep Work").unwrap().as_str(), "Deep Work");
    }
}
