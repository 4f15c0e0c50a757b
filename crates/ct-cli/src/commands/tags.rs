//! Tags command for listing tag suggestions.

use std::io::Write;

use anyhow::Result;

use ct_core::{Clock, EventLog, TimerService};

pub fn run<W: Write, L: EventLog, C: Clock>(
    writer: &mut W,
    service: &TimerService<L, C>,
) -> Result<()> {
    for tag in service.list_all_tags()? {
        writeln!(writer, "{tag}")?;
    }
    Ok(())
}
