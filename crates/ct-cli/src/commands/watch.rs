//! Watch command: the countdown loop.
//!
//! Each iteration re-reads the log so that a `ct stop` from another shell is
//! noticed within one poll interval, redraws the remaining time in place, and
//! finishes the session once the countdown reaches zero. A failed re-read
//! only costs that notice; the countdown carries on from memory.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;

use ct_core::{ActiveSession, Clock, EventLog, TimerService, TimerState};

use crate::commands::status::{write_alarm, write_header};
use crate::commands::util::{format_remaining, report_write_error};

pub fn run<W: Write, L: EventLog, C: Clock>(
    writer: &mut W,
    service: &mut TimerService<L, C>,
    poll_interval: Duration,
) -> Result<()> {
    let Some(active) = service.active().cloned() else {
        writeln!(writer, "No active timer.")?;
        return Ok(());
    };
    if matches!(service.timer().state(), TimerState::Alarm(_)) {
        return write_alarm(writer, &active);
    }

    let handle = active.handle();
    write_header(writer, &active)?;

    loop {
        if let Err(err) = service.refresh() {
            tracing::warn!(error = %err, "failed to re-read event log, counting down from memory");
        }
        if service.active().map(ActiveSession::handle).as_ref() != Some(&handle) {
            tracing::debug!(session_id = %handle, "session ended elsewhere");
            writeln!(writer)?;
            writeln!(writer, "Timer stopped.")?;
            return Ok(());
        }
        if matches!(service.timer().state(), TimerState::Alarm(_)) {
            writeln!(writer)?;
            return write_alarm(writer, &active);
        }

        let now = service.clock().now();
        let remaining = service.poll_remaining(&handle, now)?;
        write!(writer, "\rTime remaining: {}", format_remaining(remaining))?;
        writer.flush()?;

        if remaining.is_zero() {
            let outcome = service.finish_timer(&handle, now)?;
            writeln!(writer)?;
            write_alarm(writer, &active)?;
            return report_write_error(writer, service, outcome.write_error);
        }

        let pause = remaining
            .to_std()
            .map_or(poll_interval, |left| left.min(poll_interval));
        service.clock().sleep(pause);
    }
}
