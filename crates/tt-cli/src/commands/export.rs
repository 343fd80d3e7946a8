//! Implementation of the `tt export` command.
//!
//! Writes every stored record as CSV, newest first, to stdout or a file.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use tt_core::{CsvExporter, ExportTimezone};

use crate::controller::{Controller, TrackerStore};

pub fn run<W, S>(
    writer: &mut W,
    controller: &Controller<'_, S>,
    timezone: ExportTimezone,
    output: Option<&Path>,
) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    let csv = controller
        .request_export(CsvExporter::new(timezone))
        .context("failed to export history")?;

    match output {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = csv.len(), "wrote export");
            writeln!(writer, "Exported history to {}", path.display())?;
        }
        None => {
            writer.write_all(&csv)?;
            writer.flush()?;
        }
    }
    Ok(())
}
