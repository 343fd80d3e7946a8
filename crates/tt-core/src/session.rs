//! The activity session state machine.
//!
//! ```text
//! Idle --select--> Idle --start--> Running <--pause/resume--> Paused
//!                                     \                         /
//!                                      +--------stop-----------+--> Stopped
//! ```
//!
//! A session times exactly one activity. Once stopped and committed it is
//! finished; the next activity needs a new session.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::Activity;
use crate::clock::{Clock, Stopwatch};
use crate::error::TrackerError;
use crate::record::HistoryRecord;
use crate::store::{ActivityCatalog, HistoryStore};
use crate::types::{ActivityName, RecordId, SaveTime, ValidationError};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Stopped,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested state change, named for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Select,
    Start,
    Pause,
    Resume,
    Stop,
    RetryCommit,
}

impl Transition {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select an activity",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::RetryCommit => "retry the commit",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializable image of a session, captured when the process hands off
/// (backgrounding, or the end of a CLI invocation) and restored afterwards.
///
/// A running session stays running across the hand-off: the resume instant is
/// kept, so time spent away is counted exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// Nanoseconds accumulated from completed running intervals.
    pub accumulated_nanos: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumed_at: Option<DateTime<Utc>>,
    /// Whole seconds elapsed at capture time.
    pub elapsed_secs: i64,
    pub captured_at: DateTime<Utc>,
    /// A stopped record whose commit failed and is awaiting a retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncommitted: Option<HistoryRecord>,
}

/// The live run of one activity.
#[derive(Debug)]
pub struct ActivitySession {
    state: SessionState,
    activity: Option<Activity>,
    start_date: Option<DateTime<Utc>>,
    stopwatch: Stopwatch,
    uncommitted: Option<HistoryRecord>,
}

impl ActivitySession {
    /// An idle session with nothing selected.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: SessionState::Idle,
            activity: None,
            start_date: None,
            stopwatch: Stopwatch::new(clock),
            uncommitted: None,
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn activity(&self) -> Option<&Activity> {
        self.activity.as_ref()
    }

    pub const fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn elapsed(&self) -> Duration {
        self.stopwatch.elapsed()
    }

    /// Whole seconds spent running so far.
    pub fn elapsed_secs(&self) -> i64 {
        self.stopwatch.elapsed_secs()
    }

    /// A stopped record that has not reached the store yet.
    pub const fn uncommitted(&self) -> Option<&HistoryRecord> {
        self.uncommitted.as_ref()
    }

    /// True once the session is stopped and its record is stored.
    pub const fn is_finished(&self) -> bool {
        matches!(self.state, SessionState::Stopped) && self.uncommitted.is_none()
    }

    /// Chooses the activity to time, registering the name if it is new.
    ///
    /// Selecting an already-known name leaves the catalog untouched.
    pub fn select<C>(&mut self, catalog: &C, name: ActivityName) -> Result<&Activity, TrackerError>
    where
        C: ActivityCatalog + ?Sized,
    {
        self.expect_state(Transition::Select, &[SessionState::Idle])?;

        let activity = if catalog.exists(&name)? {
            Activity::known(name)
        } else {
            match catalog.register(&name) {
                Ok(activity) => activity,
                // Registered concurrently between the check and the insert.
                Err(TrackerError::DuplicateName(name)) => Activity::known(name),
                Err(err) => return Err(err),
            }
        };
        tracing::debug!(activity = %activity.name, "activity selected");
        Ok(&*self.activity.insert(activity))
    }

    /// Begins timing the selected activity from zero.
    pub fn start(&mut self) -> Result<(), TrackerError> {
        self.expect_state(Transition::Start, &[SessionState::Idle])?;
        let Some(activity) = &self.activity else {
            return Err(self.invalid(Transition::Start, "no activity selected"));
        };

        let now = self.stopwatch.clock().now();
        self.stopwatch =
            Stopwatch::from_parts(Arc::clone(self.stopwatch.clock()), Duration::zero(), Some(now));
        self.start_date = Some(now);
        self.state = SessionState::Running;
        tracing::debug!(activity = %activity.name, start = %now, "session started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TrackerError> {
        self.expect_state(Transition::Pause, &[SessionState::Running])?;
        self.stopwatch.pause();
        self.state = SessionState::Paused;
        tracing::debug!(elapsed_secs = self.elapsed_secs(), "session paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TrackerError> {
        self.expect_state(Transition::Resume, &[SessionState::Paused])?;
        self.stopwatch.start();
        self.state = SessionState::Running;
        tracing::debug!(elapsed_secs = self.elapsed_secs(), "session resumed");
        Ok(())
    }

    /// The start/pause button: starts an idle session, pauses a running one,
    /// resumes a paused one. Returns the new state.
    pub fn toggle(&mut self) -> Result<SessionState, TrackerError> {
        match self.state {
            SessionState::Idle => self.start()?,
            SessionState::Running => self.pause()?,
            SessionState::Paused => self.resume()?,
            SessionState::Stopped => {
                return Err(self.invalid(Transition::Start, "session is already stopped"));
            }
        }
        Ok(self.state)
    }

    /// Ends the session and commits its record.
    ///
    /// Zero-duration sessions are committed like any other. If the store
    /// rejects the write, the record is kept in memory and can be committed
    /// again with [`Self::retry_commit`].
    pub fn stop<S>(&mut self, store: &S) -> Result<HistoryRecord, TrackerError>
    where
        S: HistoryStore + ?Sized,
    {
        self.finish()?;
        self.commit(store)
    }

    /// Ends the session without touching the store.
    ///
    /// The session becomes Stopped with its record awaiting commit. Callers
    /// that must survive a crash between the commit and their own bookkeeping
    /// persist a snapshot at this point, then call [`Self::retry_commit`];
    /// the record keeps its id, so a repeated commit is recognised by the
    /// store.
    pub fn finish(&mut self) -> Result<&HistoryRecord, TrackerError> {
        self.expect_state(
            Transition::Stop,
            &[SessionState::Running, SessionState::Paused],
        )?;
        let (Some(activity), Some(start_date)) = (&self.activity, self.start_date) else {
            return Err(self.invalid(Transition::Stop, "session has no start"));
        };

        self.stopwatch.pause();
        let now = self.stopwatch.clock().now();
        let end_date = now.max(start_date);
        let record = HistoryRecord {
            id: RecordId::generate(),
            name: activity.name.clone(),
            start_date,
            end_date,
            duration_secs: self.stopwatch.elapsed_secs(),
            uploaded: false,
            save_time: SaveTime::at(now),
        };

        self.state = SessionState::Stopped;
        tracing::debug!(record_id = %record.id, "session finished");
        Ok(&*self.uncommitted.insert(record))
    }

    /// Commits a record whose earlier write failed.
    pub fn retry_commit<S>(&mut self, store: &S) -> Result<HistoryRecord, TrackerError>
    where
        S: HistoryStore + ?Sized,
    {
        if self.uncommitted.is_none() {
            return Err(self.invalid(Transition::RetryCommit, "nothing is awaiting commit"));
        }
        self.commit(store)
    }

    /// Drops an uncommitted record, acknowledging that it will not be saved.
    pub fn take_uncommitted(&mut self) -> Option<HistoryRecord> {
        self.uncommitted.take()
    }

    fn commit<S>(&mut self, store: &S) -> Result<HistoryRecord, TrackerError>
    where
        S: HistoryStore + ?Sized,
    {
        let Some(record) = self.uncommitted.take() else {
            return Err(self.invalid(Transition::RetryCommit, "nothing is awaiting commit"));
        };
        if let Err(err) = store.append(&record) {
            tracing::warn!(
                record_id = %record.id,
                activity = %record.name,
                error = %err,
                "failed to commit history record; keeping it for retry"
            );
            self.uncommitted = Some(record);
            return Err(err.into());
        }
        tracing::info!(
            record_id = %record.id,
            activity = %record.name,
            duration_secs = record.duration_secs,
            "history record committed"
        );
        Ok(record)
    }

    /// Captures the session for a process hand-off.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            activity: self.activity.clone(),
            start_date: self.start_date,
            accumulated_nanos: self
                .stopwatch
                .accumulated()
                .num_nanoseconds()
                .unwrap_or(i64::MAX),
            resumed_at: self.stopwatch.resumed_at(),
            elapsed_secs: self.elapsed_secs(),
            captured_at: self.stopwatch.clock().now(),
            uncommitted: self.uncommitted.clone(),
        }
    }

    /// Rebuilds an equivalent session from a snapshot.
    pub fn restore(clock: Arc<dyn Clock>, snapshot: SessionSnapshot) -> Result<Self, ValidationError> {
        let SessionSnapshot {
            state,
            activity,
            start_date,
            accumulated_nanos,
            resumed_at,
            uncommitted,
            ..
        } = snapshot;

        let consistent = match state {
            SessionState::Idle => start_date.is_none() && resumed_at.is_none(),
            SessionState::Running => {
                activity.is_some() && start_date.is_some() && resumed_at.is_some()
            }
            SessionState::Paused => {
                activity.is_some() && start_date.is_some() && resumed_at.is_none()
            }
            SessionState::Stopped => uncommitted.is_some(),
        };
        if !consistent || accumulated_nanos < 0 {
            return Err(ValidationError::InconsistentSnapshot { state });
        }

        Ok(Self {
            state,
            activity,
            start_date,
            stopwatch: Stopwatch::from_parts(
                clock,
                Duration::nanoseconds(accumulated_nanos),
                resumed_at,
            ),
            uncommitted,
        })
    }

    fn expect_state(
        &self,
        action: Transition,
        allowed: &[SessionState],
    ) -> Result<(), TrackerError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        let reason = match self.state {
            SessionState::Idle => "session has not started",
            SessionState::Running => "session is running",
            SessionState::Paused => "session is paused",
            SessionState::Stopped => "session is already stopped",
        };
        Err(self.invalid(action, reason))
    }

    fn invalid(&self, action: Transition, reason: &'static str) -> TrackerError {
        tracing::warn!(%action, state = %self.state, reason, "invalid session transition");
        TrackerError::InvalidState {
            action,
            state: self.state,
            reason,
        }
    }
}
