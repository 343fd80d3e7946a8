//! Watch command: redraws the elapsed time of the saved session.
//!
//! Display only. Each tick re-reads the snapshot, so commands run from
//! another terminal show up on the next redraw.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use tt_core::Clock;

use super::timer::describe;
use super::util::peek_session;
use crate::session_file::SessionFile;

pub const TICK: Duration = Duration::from_secs(1);

pub fn run<W: Write>(
    writer: &mut W,
    session_file: &SessionFile,
    clock: &Arc<dyn Clock>,
    ticks: Option<u64>,
    interval: Duration,
) -> Result<()> {
    let mut drawn = 0u64;
    loop {
        let session = peek_session(session_file, Arc::clone(clock))?;
        // Pad so a shorter line fully covers the previous one.
        write!(writer, "\r{:<60}", describe(&session))?;
        writer.flush()?;
        drawn += 1;

        if ticks.is_some_and(|limit| drawn >= limit) {
            break;
        }
        std::thread::sleep(interval);
    }
    writeln!(writer)?;
    Ok(())
}
