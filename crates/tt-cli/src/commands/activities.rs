//! Activities command for listing and registering activity names.

use std::io::Write;

use anyhow::Result;

use tt_core::ActivityCatalog;

use super::util::parse_name;

pub fn list<W, C>(writer: &mut W, catalog: &C, json: bool) -> Result<()>
where
    W: Write,
    C: ActivityCatalog + ?Sized,
{
    let activities = catalog.activities()?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&activities)?)?;
        return Ok(());
    }

    if activities.is_empty() {
        writeln!(writer, "No activities yet.")?;
        writeln!(writer)?;
        writeln!(writer, "Tip: Use 'tt start <name>' to begin timing a new one.")?;
        return Ok(());
    }
    for activity in &activities {
        writeln!(writer, "{}", activity.name)?;
    }
    Ok(())
}

/// Registers a new name. Duplicates are an error.
pub fn add<W, C>(writer: &mut W, catalog: &C, name: &str) -> Result<()>
where
    W: Write,
    C: ActivityCatalog + ?Sized,
{
    let activity = catalog.register(&parse_name(name)?)?;
    writeln!(writer, "Added {}", activity.name)?;
    Ok(())
}
