//! Clear command: deletes all history.

use std::io::Write;

use anyhow::{Result, bail};

use crate::controller::{Controller, TrackerStore};

pub fn run<W, S>(writer: &mut W, controller: &Controller<'_, S>, yes: bool) -> Result<()>
where
    W: Write,
    S: TrackerStore + ?Sized,
{
    if !yes {
        bail!("refusing to delete all history without --yes");
    }
    let removed = controller.request_delete_all()?;
    writeln!(writer, "Deleted {removed} record(s)")?;
    Ok(())
}
