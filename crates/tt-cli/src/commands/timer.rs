//! Session commands: `select`, `start`, `toggle`, `pause`, `resume`, `stop`,
//! and `discard`.

use std::io::Write;

use anyhow::{Context, Result};

use tt_core::{ActivitySession, SessionState, TrackerError, format_duration};

use super::util::parse_name;
use crate::controller::{Controller, TrackerStore};

/// One-line summary such as `running  Reading  00:01:30`.
pub fn describe(session: &ActivitySession) -> String {
    let name = session
        .activity()
        .map_or("(no activity)", |a| a.name.as_str());
    format!(
        "{}  {}  {}",
        session.state(),
        name,
        format_duration(session.elapsed_secs())
    )
}

pub fn select<W, S>(writer: &mut W, controller: &mut Controller<'_, S>, name: &str) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    controller.activity_selected(parse_name(name)?)?;
    writeln!(writer, "Selected {name}")?;
    Ok(())
}

pub fn start<W, S>(
    writer: &mut W,
    controller: &mut Controller<'_, S>,
    name: Option<&str>,
) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    if let Some(name) = name {
        controller.activity_selected(parse_name(name)?)?;
    }
    controller.start()?;
    writeln!(writer, "{}", describe(controller.session()))?;
    Ok(())
}

pub fn toggle<W, S>(writer: &mut W, controller: &mut Controller<'_, S>) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    controller.start_pause_tapped()?;
    writeln!(writer, "{}", describe(controller.session()))?;
    Ok(())
}

pub fn pause<W, S>(writer: &mut W, controller: &mut Controller<'_, S>) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    controller.pause()?;
    writeln!(writer, "{}", describe(controller.session()))?;
    Ok(())
}

pub fn resume<W, S>(writer: &mut W, controller: &mut Controller<'_, S>) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    controller.resume()?;
    writeln!(writer, "{}", describe(controller.session()))?;
    Ok(())
}

/// Stops the session, or retries a commit that failed earlier.
pub fn stop<W, S>(writer: &mut W, controller: &mut Controller<'_, S>) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    let record = match controller.stop_tapped() {
        Ok(record) => record,
        Err(e @ TrackerError::Persistence(_)) => {
            return Err(e).context(
                "session stopped but not saved; run `tt stop` to retry or `tt discard` to drop it",
            );
        }
        Err(e) => return Err(e.into()),
    };
    writeln!(
        writer,
        "Saved {}  {}  ({})",
        record.name,
        format_duration(record.duration_secs),
        record.id
    )?;
    Ok(())
}

pub fn discard<W, S>(writer: &mut W, controller: &mut Controller<'_, S>) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    let state = controller.session().state();
    match controller.discard() {
        Some(record) => writeln!(writer, "Discarded unsaved session for {}", record.name)?,
        None if state == SessionState::Idle => writeln!(writer, "Nothing to discard")?,
        None => writeln!(writer, "Discarded {state} session")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, Utc};
    use insta::assert_snapshot;
    use tt_core::{ActivityCatalog, ActivityName, HistoryStore, ManualClock, MemoryStore};

    use super::*;
    use crate::commands::testing::FlakyStore;

    fn clock() -> Arc<ManualClock> {
        let start = DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Arc::new(ManualClock::new(start))
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn start_pause_resume_stop_flow() {
        let store = MemoryStore::new();
        let clock = clock();
        let mut controller = Controller::app_returned_foreground(&store, clock.clone(), None).unwrap();
        let mut out = Vec::new();

        start(&mut out, &mut controller, Some("Reading")).unwrap();
        clock.advance(Duration::seconds(30));
        pause(&mut out, &mut controller).unwrap();
        clock.advance(Duration::seconds(60));
        resume(&mut out, &mut controller).unwrap();
        clock.advance(Duration::seconds(60));
        toggle(&mut out, &mut controller).unwrap();

        let rendered = output(out);
        assert_snapshot!(rendered, @r"
        running  Reading  00:00:00
        paused  Reading  00:00:30
        running  Reading  00:00:30
        paused  Reading  00:01:30
        ");

        let mut out = Vec::new();
        stop(&mut out, &mut controller).unwrap();
        let records = store.all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration_secs, 90);
        assert_eq!(records[0].wall_clock_secs(), 150);
        assert_eq!(
            output(out),
            format!("Saved Reading  00:01:30  ({})\n", records[0].id)
        );
    }

    #[test]
    fn select_then_start_without_name() {
        let store = MemoryStore::new();
        let mut controller = Controller::app_returned_foreground(&store, clock(), None).unwrap();
        let mut out = Vec::new();

        select(&mut out, &mut controller, "Writing").unwrap();
        start(&mut out, &mut controller, None).unwrap();
        assert_snapshot!(output(out), @r"
        Selected Writing
        running  Writing  00:00:00
        ");
        assert!(store.exists(&ActivityName::new("Writing").unwrap()).unwrap());
    }

    #[test]
    fn start_without_selection_fails() {
        let store = MemoryStore::new();
        let mut controller = Controller::app_returned_foreground(&store, clock(), None).unwrap();
        let err = start(&mut Vec::new(), &mut controller, None).unwrap_err();
        assert_eq!(err.to_string(), "cannot start: no activity selected");
    }

    #[test]
    fn discard_reports_what_was_dropped() {
        let store = MemoryStore::new();
        let mut controller = Controller::app_returned_foreground(&store, clock(), None).unwrap();
        let mut out = Vec::new();

        discard(&mut out, &mut controller).unwrap();
        start(&mut Vec::new(), &mut controller, Some("Reading")).unwrap();
        discard(&mut out, &mut controller).unwrap();

        assert_snapshot!(output(out), @r"
        Nothing to discard
        Discarded running session
        ");
    }

    #[test]
    fn failed_stop_can_be_retried() {
        let store = FlakyStore::default();
        let clock = clock();
        let mut controller = Controller::app_returned_foreground(&store, clock.clone(), None).unwrap();
        start(&mut Vec::new(), &mut controller, Some("Reading")).unwrap();
        clock.advance(Duration::seconds(45));

        let err = stop(&mut Vec::new(), &mut controller).unwrap_err();
        assert!(err.to_string().contains("tt stop"));
        assert!(controller.session().uncommitted().is_some());

        clock.advance(Duration::seconds(600));
        store.recover();
        stop(&mut Vec::new(), &mut controller).unwrap();

        let records = store.all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration_secs, 45);
    }
}
