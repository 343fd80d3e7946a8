//! Completed timing sessions.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActivityName, RecordId, SaveTime};

/// One completed timing session, as persisted in the history store.
///
/// `duration_secs` excludes paused time, so it is generally smaller than
/// `end_date - start_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: RecordId,
    pub name: ActivityName,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub duration_secs: i64,
    #[serde(default)]
    pub uploaded: bool,
    pub save_time: SaveTime,
}

impl HistoryRecord {
    /// Wall-clock span between start and end, pauses included.
    pub fn wall_clock_secs(&self) -> i64 {
        (self.end_date - self.start_date).num_seconds()
    }

    /// True when both describe the same session. The upload flag is ignored,
    /// since it changes after the record is stored.
    pub fn same_session(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.start_date == other.start_date
            && self.end_date == other.end_date
            && self.duration_secs == other.duration_secs
            && self.save_time == other.save_time
    }
}

/// History ordering: most recent start first, newest save breaking ties.
pub fn newest_first(a: &HistoryRecord, b: &HistoryRecord) -> Ordering {
    b.start_date
        .cmp(&a.start_date)
        .then_with(|| b.save_time.cmp(&a.save_time))
}
