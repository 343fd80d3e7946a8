//! In-memory store implementing both storage traits.
//!
//! Nothing survives the process. Used by tests and as a scratch store when no
//! database is configured.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use crate::activity::Activity;
use crate::error::{PersistenceError, TrackerError};
use crate::record::{HistoryRecord, newest_first};
use crate::store::{ActivityCatalog, HistoryStore};
use crate::types::{ActivityName, RecordId};

#[derive(Debug, Default)]
struct MemoryState {
    activities: BTreeMap<ActivityName, Activity>,
    records: Vec<HistoryRecord>,
}

impl MemoryState {
    fn name_known(&self, name: &ActivityName) -> bool {
        self.activities.contains_key(name) || self.records.iter().any(|r| &r.name == name)
    }

    fn sorted(&self, pending_only: bool) -> Vec<HistoryRecord> {
        let mut records: Vec<HistoryRecord> = self
            .records
            .iter()
            .filter(|r| !pending_only || !r.uploaded)
            .cloned()
            .collect();
        records.sort_by(newest_first);
        records
    }
}

/// Mutex-guarded activity catalog and history log.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, PersistenceError> {
        self.state
            .lock()
            .map_err(|_| PersistenceError::new("memory store lock poisoned"))
    }
}

impl ActivityCatalog for MemoryStore {
    fn exists(&self, name: &ActivityName) -> Result<bool, PersistenceError> {
        Ok(self.lock()?.name_known(name))
    }

    fn register(&self, name: &ActivityName) -> Result<Activity, TrackerError> {
        let mut state = self.lock()?;
        if state.name_known(name) {
            return Err(TrackerError::DuplicateName(name.clone()));
        }
        let activity = Activity::new(name.clone(), Utc::now());
        state.activities.insert(name.clone(), activity.clone());
        tracing::info!(activity = %name, "registered activity");
        Ok(activity)
    }

    fn activities(&self) -> Result<Vec<Activity>, PersistenceError> {
        Ok(self.lock()?.activities.values().cloned().collect())
    }
}

impl HistoryStore for MemoryStore {
    fn append(&self, record: &HistoryRecord) -> Result<(), PersistenceError> {
        let mut state = self.lock()?;
        if let Some(stored) = state.records.iter().find(|r| r.id == record.id) {
            if stored.same_session(record) {
                tracing::debug!(record_id = %record.id, "history record already stored");
                return Ok(());
            }
            return Err(PersistenceError::new(format!(
                "history record {} already stored with different contents",
                record.id
            )));
        }
        state.records.push(record.clone());
        Ok(())
    }

    fn all_records(&self) -> Result<Vec<HistoryRecord>, PersistenceError> {
        Ok(self.lock()?.sorted(false))
    }

    fn pending_records(&self) -> Result<Vec<HistoryRecord>, PersistenceError> {
        Ok(self.lock()?.sorted(true))
    }

    fn delete_all(&self) -> Result<usize, PersistenceError> {
        let mut state = self.lock()?;
        let removed = state.records.len();
        state.records.clear();
        Ok(removed)
    }

    fn mark_uploaded(&self, id: &RecordId) -> Result<bool, PersistenceError> {
        let mut state = self.lock()?;
        let Some(record) = state.records.iter_mut().find(|r| &r.id == id) else {
            return Ok(false);
        };
        record.uploaded = true;
        Ok(true)
    }
}
