//! History command: lists saved sessions and flags them as uploaded.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;

use tt_core::{ExportTimezone, HistoryRecord, HistoryStore, RecordId, format_duration};

/// JSON view of a record, with the duration also rendered as `HH:MM:SS`.
#[derive(Debug, Serialize)]
struct RecordJson<'a> {
    #[serde(flatten)]
    record: &'a HistoryRecord,
    duration: String,
}

/// Which records `history` lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryFilter {
    /// Only records not yet uploaded.
    pub pending: bool,
    /// Only records that started on this date, the current day in the
    /// display time zone.
    pub today: Option<NaiveDate>,
}

pub fn run<W, S>(
    writer: &mut W,
    store: &S,
    filter: HistoryFilter,
    json: bool,
    timezone: ExportTimezone,
) -> Result<()>
where
    W: Write,
    S: HistoryStore + ?Sized,
{
    let mut records = if filter.pending {
        store.pending_records()?
    } else {
        store.all_records()?
    };
    if let Some(today) = filter.today {
        records.retain(|r| timezone.date_of(r.start_date) == today);
    }

    if json {
        let rows: Vec<RecordJson<'_>> = records
            .iter()
            .map(|record| RecordJson {
                record,
                duration: format_duration(record.duration_secs),
            })
            .collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&rows)?)?;
        return Ok(());
    }

    if records.is_empty() {
        let what = if filter.pending { "pending records" } else { "records" };
        let when = if filter.today.is_some() { " today" } else { "" };
        writeln!(writer, "No {what}{when}.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<36}  {:<19}  {:<19}  {:>8}  {:<8}  Activity",
        "ID", "Start", "End", "Duration", "Uploaded"
    )?;
    for record in &records {
        writeln!(
            writer,
            "{:<36}  {:<19}  {:<19}  {:>8}  {:<8}  {}",
            record.id,
            timezone.format(record.start_date),
            timezone.format(record.end_date),
            format_duration(record.duration_secs),
            if record.uploaded { "yes" } else { "no" },
            record.name
        )?;
    }
    Ok(())
}

/// Flags the given records (or every pending record) as uploaded.
pub fn mark_uploaded<W, S>(writer: &mut W, store: &S, ids: &[String], all_pending: bool) -> Result<()>
where
    W: Write,
    S: HistoryStore + ?Sized,
{
    let ids: Vec<RecordId> = if all_pending {
        store.pending_records()?.into_iter().map(|r| r.id).collect()
    } else {
        ids.iter()
            .map(|id| RecordId::new(id.as_str()))
            .collect::<Result<_, _>>()?
    };

    let mut marked = 0usize;
    let mut missing = Vec::new();
    for id in ids {
        if store.mark_uploaded(&id)? {
            marked += 1;
        } else {
            missing.push(id);
        }
    }
    tracing::info!(marked, missing = missing.len(), "marked records as uploaded");
    writeln!(writer, "Marked {marked} record(s) as uploaded")?;

    if !missing.is_empty() {
        let list: Vec<&str> = missing.iter().map(RecordId::as_str).collect();
        bail!("no record with ID: {}", list.join(", "));
    }
    Ok(())
}
