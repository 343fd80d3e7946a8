//! Wall-clock access and the pausable stopwatch.
//!
//! Elapsed time is always recomputed from the recorded resume instant and the
//! current instant. Display ticks never feed back into the count, so a late or
//! missed tick cannot skew a duration.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

/// Source of the current instant.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used by tests and replay tooling.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward (or backward, for a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Elapsed-time tracker with pause support.
///
/// Time is accumulated at full precision and only truncated to whole seconds
/// by [`Stopwatch::elapsed_secs`], so repeated pause/resume cycles never drop
/// fractional seconds.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    accumulated: Duration,
    resumed_at: Option<DateTime<Utc>>,
}

impl Stopwatch {
    /// A stopped stopwatch at zero.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            accumulated: Duration::zero(),
            resumed_at: None,
        }
    }

    /// Rebuilds a stopwatch from previously captured parts.
    pub fn from_parts(
        clock: Arc<dyn Clock>,
        accumulated: Duration,
        resumed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            clock,
            accumulated: accumulated.max(Duration::zero()),
            resumed_at,
        }
    }

    /// Starts counting, continuing from any accumulated time.
    ///
    /// Has no effect while already running.
    pub fn start(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(self.clock.now());
        }
    }

    /// Freezes the count, folding the running interval into the accumulated
    /// total.
    pub fn pause(&mut self) {
        if let Some(since) = self.resumed_at.take() {
            self.accumulated += span(since, self.clock.now());
        }
    }

    /// Returns to zero and stops.
    pub fn reset(&mut self) {
        self.accumulated = Duration::zero();
        self.resumed_at = None;
    }

    pub const fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    /// Accumulated time plus the current running interval, if any.
    pub fn elapsed(&self) -> Duration {
        match self.resumed_at {
            Some(since) => self.accumulated + span(since, self.clock.now()),
            None => self.accumulated,
        }
    }

    /// Whole seconds elapsed.
    pub fn elapsed_secs(&self) -> i64 {
        self.elapsed().num_seconds()
    }

    /// Time accumulated from completed running intervals.
    pub const fn accumulated(&self) -> Duration {
        self.accumulated
    }

    /// Start of the current running interval.
    pub const fn resumed_at(&self) -> Option<DateTime<Utc>> {
        self.resumed_at
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

/// Non-negative span between two instants; a clock stepping backwards
/// contributes nothing.
fn span(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).max(Duration::zero())
}
