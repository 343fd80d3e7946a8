//! CSV export of history records.

use std::io::Write;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::HistoryRecord;

/// Column titles of the exported table.
pub const CSV_HEADER: [&str; 4] = ["Activity", "Start", "End", "Duration"];

/// Layout of the start and end columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush export: {0}")]
    Io(#[from] std::io::Error),
}

/// Time zone used to render start and end dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTimezone {
    #[default]
    Local,
    Utc,
}

impl ExportTimezone {
    /// Renders an instant with [`DATE_FORMAT`] in this zone.
    pub fn format(self, instant: DateTime<Utc>) -> String {
        match self {
            Self::Local => instant.with_timezone(&Local).format(DATE_FORMAT).to_string(),
            Self::Utc => instant.format(DATE_FORMAT).to_string(),
        }
    }

    /// Calendar date of an instant in this zone.
    pub fn date_of(self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => instant.with_timezone(&Local).date_naive(),
            Self::Utc => instant.date_naive(),
        }
    }
}

/// Serializes history into a CSV table with one header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter {
    timezone: ExportTimezone,
}

impl CsvExporter {
    pub const fn new(timezone: ExportTimezone) -> Self {
        Self { timezone }
    }

    /// Renders the records in the given order. Empty input yields just the
    /// header row.
    pub fn export(&self, records: &[HistoryRecord]) -> Result<Vec<u8>, ExportError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf, records)?;
        Ok(buf)
    }

    /// Streams the table into `writer`, returning the number of data rows.
    pub fn write_to<W: Write>(
        &self,
        writer: W,
        records: &[HistoryRecord],
    ) -> Result<usize, ExportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for record in records {
            let start = self.timezone.format(record.start_date);
            let end = self.timezone.format(record.end_date);
            let duration = format_duration(record.duration_secs);
            wtr.write_record([
                record.name.as_str(),
                start.as_str(),
                end.as_str(),
                duration.as_str(),
            ])?;
        }
        wtr.flush()?;
        tracing::debug!(rows = records.len(), "exported history as CSV");
        Ok(records.len())
    }
}

/// Formats whole seconds as `HH:MM:SS`. Hours grow past two digits as needed;
/// negative input renders as zero.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
