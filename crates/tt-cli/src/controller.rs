//! Maps UI notifications onto session transitions and store calls.
//!
//! The controller owns the single live [`ActivitySession`]. It never holds
//! more than one; a finished session is replaced by a fresh one when the next
//! activity is selected.

use std::sync::Arc;

use tt_core::{
    ActivityCatalog, ActivityName, ActivitySession, Clock, CsvExporter, ExportError,
    HistoryRecord, HistoryStore, PersistenceError, SessionSnapshot, SessionState, TrackerError,
    ValidationError,
};

/// Stores the controller needs: both the catalog and the history log.
pub trait TrackerStore: ActivityCatalog + HistoryStore {}

impl<T: ActivityCatalog + HistoryStore + ?Sized> TrackerStore for T {}

/// Durably records a stopped session before its record is committed.
pub type Checkpoint<'a> = Box<dyn FnMut(&SessionSnapshot) -> Result<(), PersistenceError> + 'a>;

pub struct Controller<'a, S: TrackerStore + ?Sized> {
    store: &'a S,
    clock: Arc<dyn Clock>,
    session: ActivitySession,
    checkpoint: Option<Checkpoint<'a>>,
}

impl<'a, S: TrackerStore + ?Sized> Controller<'a, S> {
    /// App returned to the foreground: rebuilds the session from the last
    /// snapshot, or starts idle when there is none.
    pub fn app_returned_foreground(
        store: &'a S,
        clock: Arc<dyn Clock>,
        snapshot: Option<SessionSnapshot>,
    ) -> Result<Self, ValidationError> {
        let session = match snapshot {
            Some(snapshot) => {
                tracing::debug!(
                    state = %snapshot.state,
                    elapsed_secs = snapshot.elapsed_secs,
                    "restoring session"
                );
                ActivitySession::restore(Arc::clone(&clock), snapshot)?
            }
            None => ActivitySession::new(Arc::clone(&clock)),
        };
        Ok(Self {
            store,
            clock,
            session,
            checkpoint: None,
        })
    }

    /// Installs a hook that persists the stopped session ahead of its commit.
    ///
    /// With a checkpoint in place, a crash after the commit leaves a snapshot
    /// holding the same record id, and the next stop finds it already stored.
    pub fn set_checkpoint(
        &mut self,
        checkpoint: impl FnMut(&SessionSnapshot) -> Result<(), PersistenceError> + 'a,
    ) {
        self.checkpoint = Some(Box::new(checkpoint));
    }

    /// App is going to the background: captures whatever must survive.
    ///
    /// Returns `None` when there is nothing worth keeping (a finished session,
    /// or an idle one with no selection).
    pub fn app_entered_background(&self) -> Option<SessionSnapshot> {
        let nothing_selected =
            self.session.state() == SessionState::Idle && self.session.activity().is_none();
        if self.session.is_finished() || nothing_selected {
            return None;
        }
        let snapshot = self.session.snapshot();
        tracing::debug!(
            state = %snapshot.state,
            elapsed_secs = snapshot.elapsed_secs,
            "captured session snapshot"
        );
        Some(snapshot)
    }

    pub const fn session(&self) -> &ActivitySession {
        &self.session
    }

    /// The user picked an activity.
    pub fn activity_selected(&mut self, name: ActivityName) -> Result<(), TrackerError> {
        if self.session.is_finished() {
            self.session = ActivitySession::new(Arc::clone(&self.clock));
        }
        self.session.select(self.store, name)?;
        Ok(())
    }

    /// The start/pause button. Returns the resulting state.
    pub fn start_pause_tapped(&mut self) -> Result<SessionState, TrackerError> {
        self.session.toggle()
    }

    pub fn start(&mut self) -> Result<(), TrackerError> {
        self.session.start()
    }

    pub fn pause(&mut self) -> Result<(), TrackerError> {
        self.session.pause()
    }

    pub fn resume(&mut self) -> Result<(), TrackerError> {
        self.session.resume()
    }

    /// The stop button. A session whose earlier commit failed is committed
    /// again instead of being stopped twice.
    ///
    /// When a checkpoint is installed it runs between finishing the session
    /// and committing; if it fails nothing is committed.
    pub fn stop_tapped(&mut self) -> Result<HistoryRecord, TrackerError> {
        if self.session.uncommitted().is_none() {
            self.session.finish()?;
            if let Some(checkpoint) = self.checkpoint.as_mut() {
                let snapshot = self.session.snapshot();
                if let Err(err) = checkpoint(&snapshot) {
                    tracing::warn!(error = %err, "failed to checkpoint stopped session");
                    return Err(err.into());
                }
            }
        }
        self.session.retry_commit(self.store)
    }

    /// Abandons the current session. Returns the record that was waiting to
    /// be committed, if any.
    pub fn discard(&mut self) -> Option<HistoryRecord> {
        let dropped = self.session.take_uncommitted();
        tracing::info!(
            state = %self.session.state(),
            had_uncommitted = dropped.is_some(),
            "session discarded"
        );
        self.session = ActivitySession::new(Arc::clone(&self.clock));
        dropped
    }

    /// CSV of every stored record, newest first.
    pub fn request_export(&self, exporter: CsvExporter) -> Result<Vec<u8>, ExportRequestError> {
        let records = self.store.all_records().map_err(TrackerError::from)?;
        Ok(exporter.export(&records)?)
    }

    /// Clears all history. Returns how many records were removed.
    pub fn request_delete_all(&self) -> Result<usize, TrackerError> {
        let removed = self.store.delete_all()?;
        tracing::info!(removed, "history cleared");
        Ok(removed)
    }
}

/// Failure while producing an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportRequestError {
    #[error(transparent)]
    Store(#[from] TrackerError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
