//! Status command for showing the active countdown.

use std::io::Write;

use anyhow::Result;

use ct_core::{ActiveSession, Clock, EventLog, TimerService, TimerState};

use crate::commands::util::{format_remaining, quoted, report_write_error};

/// Prints the active session; finishes it first if its time is already up.
pub fn run<W: Write, L: EventLog, C: Clock>(
    writer: &mut W,
    service: &mut TimerService<L, C>,
) -> Result<()> {
    let Some(active) = service.active().cloned() else {
        writeln!(writer, "No active timer.")?;
        return Ok(());
    };
    let handle = active.handle();

    if matches!(service.timer().state(), TimerState::Running(_)) {
        let now = service.clock().now();
        let remaining = service.poll_remaining(&handle, now)?;
        if !remaining.is_zero() {
            write_header(writer, &active)?;
            writeln!(writer, "Time remaining: {}", format_remaining(remaining))?;
            return Ok(());
        }
        let outcome = service.finish_timer(&handle, now)?;
        write_alarm(writer, &active)?;
        return report_write_error(writer, service, outcome.write_error);
    }

    write_alarm(writer, &active)
}

pub fn write_header<W: Write>(writer: &mut W, active: &ActiveSession) -> Result<()> {
    writeln!(writer, "Counting down: {}", quoted(&active.info.title))?;
    if !active.info.tags.is_empty() {
        writeln!(writer, "Tags: {}", active.info.tags)?;
    }
    Ok(())
}

pub fn write_alarm<W: Write>(writer: &mut W, active: &ActiveSession) -> Result<()> {
    writeln!(writer, "Time's up!")?;
    writeln!(
        writer,
        "You completed your session: {}",
        quoted(&active.info.title)
    )?;
    writeln!(writer, "Run `ct ack` to acknowledge.")?;
    Ok(())
}
