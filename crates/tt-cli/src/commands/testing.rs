//! Test doubles shared by the command tests.

use std::sync::atomic::{AtomicBool, Ordering};

use tt_core::{
    Activity, ActivityCatalog, ActivityName, HistoryRecord, HistoryStore, MemoryStore,
    PersistenceError, RecordId, TrackerError,
};

/// Store whose history writes fail until [`FlakyStore::recover`] is called.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    healthy: AtomicBool,
}

impl FlakyStore {
    pub fn recover(&self) {
        self.healthy.store(true, Ordering::SeqCst);
    }
}

impl ActivityCatalog for FlakyStore {
    fn exists(&self, name: &ActivityName) -> Result<bool, PersistenceError> {
        self.inner.exists(name)
    }
    fn register(&self, name: &ActivityName) -> Result<Activity, TrackerError> {
        self.inner.register(name)
    }
    fn activities(&self) -> Result<Vec<Activity>, PersistenceError> {
        self.inner.activities()
    }
}

impl HistoryStore for FlakyStore {
    fn append(&self, record: &HistoryRecord) -> Result<(), PersistenceError> {
        if self.healthy.load(Ordering::SeqCst) {
            self.inner.append(record)
        } else {
            Err(PersistenceError::new("disk full"))
        }
    }
    fn all_records(&self) -> Result<Vec<HistoryRecord>, PersistenceError> {
        self.inner.all_records()
    }
    fn pending_records(&self) -> Result<Vec<HistoryRecord>, PersistenceError> {
        self.inner.pending_records()
    }
    fn delete_all(&self) -> Result<usize, PersistenceError> {
        self.inner.delete_all()
    }
    fn mark_uploaded(&self, id: &RecordId) -> Result<bool, PersistenceError> {
        self.inner.mark_uploaded(id)
    }
}
