//! Core domain logic for the activity time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Timing: a pausable stopwatch driven by wall-clock timestamps
//! - Sessions: the select/start/pause/resume/stop state machine
//! - Storage seams: the activity catalog and history store traits
//! - Export: rendering history as CSV

mod activity;
pub mod clock;
mod error;
pub mod export;
mod memory;
mod record;
pub mod session;
pub mod store;
pub mod types;

pub use activity::Activity;
pub use clock::{Clock, ManualClock, Stopwatch, SystemClock};
pub use error::{PersistenceError, TrackerError};
pub use export::{CsvExporter, ExportError, ExportTimezone, format_duration};
pub use memory::MemoryStore;
pub use record::{HistoryRecord, newest_first};
pub use session::{ActivitySession, SessionSnapshot, SessionState, Transition};
pub use store::{ActivityCatalog, HistoryStore};
pub use types::{ActivityName, RecordId, SaveTime, ValidationError};
