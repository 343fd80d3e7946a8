//! On-disk hand-off of the in-progress session between invocations.
//!
//! Each `tt` invocation is one foreground period: it loads the snapshot,
//! applies a command, and writes the snapshot back before exiting. An
//! exclusive lock on a sibling `.lock` file serializes concurrent invocations.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use tt_core::SessionSnapshot;

/// Location of the session snapshot.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

/// Held while a command reads or writes the snapshot. Unlocks on drop.
#[derive(Debug)]
pub struct SessionLock {
    file: File,
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!(error = %e, "failed to release session lock");
        }
    }
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Blocks until this process holds the session lock.
    pub fn lock(&self) -> Result<SessionLock> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("failed to create session directory")?;
        }
        let file = File::create(self.lock_path()).context("failed to create session lock file")?;
        file.lock_exclusive()
            .context("failed to acquire session lock")?;
        Ok(SessionLock { file })
    }

    /// Reads the snapshot, if one exists.
    pub fn load(&self) -> Result<Option<SessionSnapshot>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let snapshot = serde_json::from_str(&content)
                    .with_context(|| format!("failed to parse {}", self.path.display()))?;
                Ok(Some(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", self.path.display())),
        }
    }

    /// Writes the snapshot via a temp file and rename, so readers never see a
    /// partial file. The temp file is synced before the rename; a snapshot
    /// that was saved is on disk even if the process dies right after.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("failed to create session directory")?;
        }
        let json =
            serde_json::to_string_pretty(snapshot).context("failed to serialize session")?;
        let temp = self.temp_path();
        let mut file = File::create(&temp).context("failed to create session snapshot")?;
        file.write_all(json.as_bytes())
            .context("failed to write session snapshot")?;
        file.sync_all().context("failed to sync session snapshot")?;
        drop(file);
        fs::rename(&temp, &self.path).context("failed to replace session snapshot")?;
        tracing::debug!(path = %self.path.display(), state = %snapshot.state, "saved session snapshot");
        Ok(())
    }

    /// Removes the snapshot. Missing files are fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "cleared session snapshot");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("failed to remove session snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use tt_core::{ActivityName, ActivitySession, ManualClock, MemoryStore, SessionState};

    use super::*;

    fn running_session() -> (Arc<ManualClock>, ActivitySession) {
        let start = DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = Arc::new(ManualClock::new(start));
        let store = MemoryStore::new();
        let mut session = ActivitySession::new(clock.clone());
        session
            .select(&store, ActivityName::new("Reading").unwrap())
            .unwrap();
        session.start().unwrap();
        clock.advance(Duration::seconds(42));
        (clock, session)
    }

    fn running_snapshot() -> SessionSnapshot {
        running_session().1.snapshot()
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("nested").join("session.json"));
        let snapshot = running_snapshot();

        let _lock = file.lock().unwrap();
        file.save(&snapshot).unwrap();
        assert_eq!(file.load().unwrap(), Some(snapshot));
        assert!(!file.temp_path().exists());
    }

    #[test]
    fn stopped_snapshot_with_unsaved_record_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        let (clock, mut session) = running_session();
        let pending = session.finish().unwrap().clone();
        file.save(&session.snapshot()).unwrap();

        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.state, SessionState::Stopped);
        assert_eq!(loaded.uncommitted.as_ref(), Some(&pending));
        let restored = ActivitySession::restore(clock, loaded).unwrap();
        assert_eq!(restored.uncommitted(), Some(&pending));
        assert!(!restored.is_finished());
    }

    #[test]
    fn overwriting_with_smaller_snapshot_leaves_no_trailing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        let (clock, mut session) = running_session();
        session.finish().unwrap();
        file.save(&session.snapshot()).unwrap();

        let idle = ActivitySession::new(clock).snapshot();
        file.save(&idle).unwrap();
        assert_eq!(file.load().unwrap(), Some(idle));
        assert!(!file.temp_path().exists());
    }

    #[test]
    fn clear_removes_snapshot_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        file.save(&running_snapshot()).unwrap();

        file.clear().unwrap();
        assert!(file.load().unwrap().is_none());
        file.clear().unwrap();
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let err = SessionFile::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
