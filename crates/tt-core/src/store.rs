//! Storage seams for activities and history records.
//!
//! Both traits require every method to be atomic with respect to every other
//! method on the same store. Implementations serialize access internally so a
//! store can be shared behind an `Arc`.

use crate::activity::Activity;
use crate::error::{PersistenceError, TrackerError};
use crate::record::HistoryRecord;
use crate::types::{ActivityName, RecordId};

/// Deduplicated set of known activity names.
pub trait ActivityCatalog: Send + Sync {
    /// Exact, case-sensitive match against every known name, including names
    /// that only appear in history.
    fn exists(&self, name: &ActivityName) -> Result<bool, PersistenceError>;

    /// Registers a new activity.
    ///
    /// The existence check and the insert happen under one lock; a name that
    /// already exists yields [`TrackerError::DuplicateName`].
    fn register(&self, name: &ActivityName) -> Result<Activity, TrackerError>;

    /// Registered activities, sorted by name.
    fn activities(&self) -> Result<Vec<Activity>, PersistenceError>;
}

/// Durable log of completed sessions.
pub trait HistoryStore: Send + Sync {
    /// Durably adds one record. Returns only after the write is persisted.
    ///
    /// Appending a record whose id is already stored succeeds without a second
    /// row when the stored record is the same session, so a commit can be
    /// retried after an interrupted hand-off. A different record under an
    /// existing id is an error.
    fn append(&self, record: &HistoryRecord) -> Result<(), PersistenceError>;

    /// Every record, most recent start first, newest save breaking ties.
    fn all_records(&self) -> Result<Vec<HistoryRecord>, PersistenceError>;

    /// Records not yet uploaded, in the same order as [`Self::all_records`].
    fn pending_records(&self) -> Result<Vec<HistoryRecord>, PersistenceError>;

    /// Removes every record. Returns how many were removed.
    fn delete_all(&self) -> Result<usize, PersistenceError>;

    /// Flags a record as uploaded. Idempotent; returns `false` if no record
    /// has the given id.
    fn mark_uploaded(&self, id: &RecordId) -> Result<bool, PersistenceError>;
}
