//! Storage layer for the time tracker.
//!
//! Provides persistence for activities and history records using `rusqlite`.
//!
//! # Thread Safety
//!
//! [`Database`] wraps its `rusqlite::Connection` in a `Mutex`, so it is both
//! `Send` and `Sync` and can be shared behind an `Arc`. Every public method
//! holds the lock for its whole duration, which makes each method atomic with
//! respect to every other method on the same `Database`.
//!
//! # Durability
//!
//! The connection runs with `synchronous = FULL`, and each write is a single
//! committed statement or transaction. A method that returns `Ok` has reached
//! disk.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 with nanosecond precision
//! (e.g., `2024-01-15T10:30:00.000000000Z`). The fixed width means:
//! - Lexicographic ordering matches chronological ordering
//! - Values round-trip without losing precision
//! - Timezone-aware (always UTC)
//!
//! ## Activity Names
//!
//! Names use SQLite's default `BINARY` collation, so lookups are exact and
//! case-sensitive.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use thiserror::Error;

use tt_core::{
    Activity, ActivityCatalog, ActivityName, HistoryRecord, HistoryStore, PersistenceError,
    RecordId, SaveTime, TrackerError,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Another thread panicked while holding the connection.
    #[error("database connection lock poisoned")]
    LockPoisoned,
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {row}: {timestamp}")]
    TimestampParse {
        row: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain invariant.
    #[error("invalid data for {row}: {message}")]
    InvalidRow { row: String, message: String },
    /// A record with this id is already stored with different contents.
    #[error("history record {id} already stored with different contents")]
    ConflictingRecord { id: String },
}

impl From<DbError> for PersistenceError {
    fn from(err: DbError) -> Self {
        let message = err.to_string();
        Self::with_source(message, err)
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

/// Raw `history` row before validation.
struct HistoryRow {
    id: String,
    name: String,
    start_date: String,
    end_date: String,
    duration_secs: i64,
    uploaded: bool,
    save_time: String,
}

const HISTORY_COLUMNS: &str = "id, name, start_date, end_date, duration_secs, uploaded, save_time";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA synchronous = FULL;")?;
        conn.execute_batch(
            "
            -- Activities: one row per distinct, case-sensitive name
            CREATE TABLE IF NOT EXISTS activities (
                name TEXT PRIMARY KEY,
                created_at TEXT NOT NULL
            );

            -- History: completed sessions
            -- duration_secs excludes paused time, so it may be less than end - start
            -- save_time: YYYYMMDDHHMMSSffffff, tie-break for equal start dates
            CREATE TABLE IF NOT EXISTS history (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                duration_secs INTEGER NOT NULL CHECK (duration_secs >= 0),
                uploaded INTEGER NOT NULL DEFAULT 0,
                save_time TEXT NOT NULL,
                CHECK (end_date >= start_date)
            );

            CREATE INDEX IF NOT EXISTS idx_history_order ON history(start_date, save_time);
            CREATE INDEX IF NOT EXISTS idx_history_uploaded ON history(uploaded);
            CREATE INDEX IF NOT EXISTS idx_history_name ON history(name);
            ",
        )?;
        Ok(())
    }

    /// Inserts one history record.
    ///
    /// Inserting a record whose id is already stored is a no-op when the
    /// stored row describes the same session, so a commit can be retried
    /// after a crash. A different row under that id is
    /// [`DbError::ConflictingRecord`].
    pub fn insert_history(&self, record: &HistoryRecord) -> Result<(), DbError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
            "
            INSERT INTO history (id, name, start_date, end_date, duration_secs, uploaded, save_time)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            ",
            params![
                record.id.as_str(),
                record.name.as_str(),
                format_timestamp(record.start_date),
                format_timestamp(record.end_date),
                record.duration_secs,
                record.uploaded,
                record.save_time.as_str(),
            ],
        )?;
        if inserted == 0 {
            let stored = history_by_id(&tx, &record.id)?;
            if !stored.is_some_and(|stored| stored.same_session(record)) {
                return Err(DbError::ConflictingRecord {
                    id: record.id.to_string(),
                });
            }
            tracing::debug!(record_id = %record.id, "history record already stored");
            return Ok(());
        }
        tx.commit()?;
        tracing::debug!(record_id = %record.id, "inserted history record");
        Ok(())
    }

    /// Lists history records, most recent start first.
    pub fn list_history(&self, pending_only: bool) -> Result<Vec<HistoryRecord>, DbError> {
        let conn = self.conn()?;
        let filter = if pending_only {
            "WHERE uploaded = 0"
        } else {
            ""
        };
        let mut stmt = conn.prepare(&format!(
            "
            SELECT {HISTORY_COLUMNS}
            FROM history
            {filter}
            ORDER BY start_date DESC, save_time DESC
            "
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(HistoryRow {
                id: row.get(0)?,
                name: row.get(1)?,
                start_date: row.get(2)?,
                end_date: row.get(3)?,
                duration_secs: row.get(4)?,
                uploaded: row.get(5)?,
                save_time: row.get(6)?,
            })
        })?;
        let mut records = Vec::new();
        for row in rows {
            records.push(history_from_row(row?)?);
        }
        Ok(records)
    }

    /// Looks up a single history record by id.
    pub fn get_history(&self, id: &RecordId) -> Result<Option<HistoryRecord>, DbError> {
        let conn = self.conn()?;
        history_by_id(&conn, id)
    }

    /// Deletes every history record, returning how many were removed.
    pub fn clear_history(&self) -> Result<usize, DbError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM history", [])?;
        tracing::info!(removed, "cleared history");
        Ok(removed)
    }

    /// Sets the uploaded flag on one record. Returns whether a row matched.
    pub fn set_uploaded(&self, id: &RecordId) -> Result<bool, DbError> {
        let conn = self.conn()?;
        let changed = conn.execute("UPDATE history SET uploaded = 1 WHERE id = ?", [id.as_str()])?;
        Ok(changed > 0)
    }

    /// Checks both tables for an exact name match.
    pub fn activity_exists(&self, name: &ActivityName) -> Result<bool, DbError> {
        let conn = self.conn()?;
        Ok(name_known(&conn, name)?)
    }

    /// Inserts an activity unless the name is already known.
    ///
    /// Returns `None` when the name exists. The check and insert share one
    /// immediate transaction, so concurrent processes cannot both insert.
    pub fn insert_activity(
        &self,
        name: &ActivityName,
        created_at: DateTime<Utc>,
    ) -> Result<Option<Activity>, DbError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if name_known(&tx, name)? {
            return Ok(None);
        }
        tx.execute(
            "INSERT INTO activities (name, created_at) VALUES (?, ?)",
            params![name.as_str(), format_timestamp(created_at)],
        )?;
        tx.commit()?;
        Ok(Some(Activity::new(name.clone(), created_at)))
    }

    /// Lists registered activities ordered by name.
    pub fn list_activities(&self) -> Result<Vec<Activity>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, created_at FROM activities ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let created_at: String = row.get(1)?;
            Ok((name, created_at))
        })?;
        let mut activities = Vec::new();
        for row in rows {
            let (name, created_at) = row?;
            let created_at = parse_timestamp(&created_at, &name)?;
            let name = ActivityName::new(name).map_err(|e| DbError::InvalidRow {
                row: "activity".to_string(),
                message: e.to_string(),
            })?;
            activities.push(Activity::new(name, created_at));
        }
        Ok(activities)
    }
}

impl ActivityCatalog for Database {
    fn exists(&self, name: &ActivityName) -> Result<bool, PersistenceError> {
        Ok(self.activity_exists(name)?)
    }

    fn register(&self, name: &ActivityName) -> Result<Activity, TrackerError> {
        let activity = self
            .insert_activity(name, Utc::now())
            .map_err(PersistenceError::from)?
            .ok_or_else(|| TrackerError::DuplicateName(name.clone()))?;
        tracing::info!(activity = %name, "registered activity");
        Ok(activity)
    }

    fn activities(&self) -> Result<Vec<Activity>, PersistenceError> {
        Ok(self.list_activities()?)
    }
}

impl HistoryStore for Database {
    fn append(&self, record: &HistoryRecord) -> Result<(), PersistenceError> {
        Ok(self.insert_history(record)?)
    }

    fn all_records(&self) -> Result<Vec<HistoryRecord>, PersistenceError> {
        Ok(self.list_history(false)?)
    }

    fn pending_records(&self) -> Result<Vec<HistoryRecord>, PersistenceError> {
        Ok(self.list_history(true)?)
    }

    fn delete_all(&self) -> Result<usize, PersistenceError> {
        Ok(self.clear_history()?)
    }

    fn mark_uploaded(&self, id: &RecordId) -> Result<bool, PersistenceError> {
        Ok(self.set_uploaded(id)?)
    }
}

fn name_known(conn: &Connection, name: &ActivityName) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "
        SELECT EXISTS(SELECT 1 FROM activities WHERE name = ?1)
            OR EXISTS(SELECT 1 FROM history WHERE name = ?1)
        ",
        [name.as_str()],
        |row| row.get(0),
    )
}

fn history_by_id(conn: &Connection, id: &RecordId) -> Result<Option<HistoryRecord>, DbError> {
    let row = conn
        .query_row(
            &format!("SELECT {HISTORY_COLUMNS} FROM history WHERE id = ?"),
            [id.as_str()],
            |row| {
                Ok(HistoryRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    start_date: row.get(2)?,
                    end_date: row.get(3)?,
                    duration_secs: row.get(4)?,
                    uploaded: row.get(5)?,
                    save_time: row.get(6)?,
                })
            },
        )
        .optional()?;
    row.map(history_from_row).transpose()
}

fn history_from_row(row: HistoryRow) -> Result<HistoryRecord, DbError> {
    let invalid = |message: String| DbError::InvalidRow {
        row: format!("history record {}", row.id),
        message,
    };
    let start_date = parse_timestamp(&row.start_date, &row.id)?;
    let end_date = parse_timestamp(&row.end_date, &row.id)?;
    let name = ActivityName::new(row.name.clone()).map_err(|e| invalid(e.to_string()))?;
    let save_time = SaveTime::parse(row.save_time.clone()).map_err(|e| invalid(e.to_string()))?;
    let id = RecordId::new(row.id.clone()).map_err(|e| invalid(e.to_string()))?;
    Ok(HistoryRecord {
        id,
        name,
        start_date,
        end_date,
        duration_secs: row.duration_secs,
        uploaded: row.uploaded,
        save_time,
    })
}

fn parse_timestamp(timestamp: &str, row: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            row: row.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
