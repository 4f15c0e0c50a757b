//! Ack command for dismissing a finished countdown.

use std::io::Write;

use anyhow::Result;

use ct_core::{Clock, EventLog, TimerService};

use crate::commands::util::{active_handle, handle_timer_error, quoted, report_write_error};

pub fn run<W: Write, L: EventLog, C: Clock>(
    writer: &mut W,
    service: &mut TimerService<L, C>,
) -> Result<()> {
    let handle = match active_handle(service, "acknowledge") {
        Ok(handle) => handle,
        Err(err) => return handle_timer_error(writer, err),
    };
    let title = service
        .active()
        .map(|active| active.info.title.clone())
        .unwrap_or_default();

    let outcome = match service.acknowledge(&handle) {
        Ok(outcome) => outcome,
        Err(err) => return handle_timer_error(writer, err),
    };
    writeln!(writer, "Acknowledged {}.", quoted(&title))?;
    report_write_error(writer, service, outcome.write_error)
}
