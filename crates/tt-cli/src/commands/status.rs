//! Status command for showing the current session.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use tt_core::{ActivitySession, ExportTimezone, SessionState, format_duration};

/// JSON view of the session.
#[derive(Debug, Serialize)]
pub struct StatusJson {
    pub state: SessionState,
    pub activity: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub elapsed_secs: i64,
    pub elapsed: String,
    pub unsaved: bool,
}

impl StatusJson {
    pub fn from_session(session: &ActivitySession) -> Self {
        Self {
            state: session.state(),
            activity: session.activity().map(|a| a.name.to_string()),
            start_date: session.start_date(),
            elapsed_secs: session.elapsed_secs(),
            elapsed: format_duration(session.elapsed_secs()),
            unsaved: session.uncommitted().is_some(),
        }
    }
}

pub fn run<W: Write>(
    writer: &mut W,
    session: &ActivitySession,
    timezone: ExportTimezone,
    json: bool,
) -> Result<()> {
    if json {
        let status = StatusJson::from_session(session);
        writeln!(writer, "{}", serde_json::to_string_pretty(&status)?)?;
        return Ok(());
    }

    writeln!(writer, "State: {}", session.state())?;
    let Some(activity) = session.activity() else {
        writeln!(writer, "No activity selected.")?;
        return Ok(());
    };
    writeln!(writer, "Activity: {}", activity.name)?;
    if let Some(start) = session.start_date() {
        writeln!(writer, "Started: {}", timezone.format(start))?;
    }
    writeln!(writer, "Elapsed: {}", format_duration(session.elapsed_secs()))?;
    if session.uncommitted().is_some() {
        writeln!(
            writer,
            "Not saved yet. Run `tt stop` to retry or `tt discard` to drop it."
        )?;
    }
    Ok(())
}
