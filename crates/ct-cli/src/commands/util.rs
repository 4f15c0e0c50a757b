//! Shared utilities for CLI commands.

use std::fmt::Display;
use std::io::Write;
use std::sync::LazyLock;

use anyhow::Context;
use chrono::Duration;
use regex::Regex;

use ct_core::{ActiveSession, Clock, EventLog, SessionHandle, StateError, TimerError, TimerService};

/// Pre-compiled regex for countdown lengths like `25`, `25m`, `1h`, `1h30m`.
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)h)?\s*(?:(\d+)m?)?$").unwrap());

/// Longest countdown accepted on the command line (one week).
const MAX_DURATION_MINUTES: u32 = 7 * 24 * 60;

/// Parse a countdown length in minutes.
///
/// Supports:
/// - Plain minutes: "25"
/// - Suffixed: "25m", "2h", "1h30m", "1h 30m"
pub fn parse_duration_minutes(s: &str) -> anyhow::Result<u32> {
    let s = s.trim();
    let caps = DURATION_RE
        .captures(s)
        .filter(|_| !s.is_empty())
        .with_context(|| format!("Invalid duration: {s}. Use minutes (e.g., 25) or 1h30m"))?;

    let hours: u32 = caps
        .get(1)
        .map_or(Ok(0), |m| m.as_str().parse())
        .context("failed to parse hours in duration")?;
    let minutes: u32 = caps
        .get(2)
        .map_or(Ok(0), |m| m.as_str().parse())
        .context("failed to parse minutes in duration")?;

    let total = hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .filter(|total| *total <= MAX_DURATION_MINUTES)
        .with_context(|| format!("Duration too large: {s} (max {MAX_DURATION_MINUTES} minutes)"))?;
    Ok(total)
}

/// Formats a remaining countdown as `MM:SS`.
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Applies the policy for transitions invoked from the wrong state.
///
/// Debug builds treat them as fatal. Release builds log and carry on, since
/// the log is never touched by a rejected transition.
pub fn handle_timer_error<W: Write>(writer: &mut W, err: TimerError) -> anyhow::Result<()> {
    match err {
        TimerError::Validation(err) => Err(err.into()),
        TimerError::State(err) if cfg!(debug_assertions) => Err(err.into()),
        TimerError::State(err) => {
            tracing::warn!(%err, "ignoring invalid timer action");
            writeln!(writer, "Nothing to do: {err}.")?;
            Ok(())
        }
    }
}

/// Handle of the running or alarming session.
pub fn active_handle<L: EventLog, C: Clock>(
    service: &TimerService<L, C>,
    operation: &'static str,
) -> Result<SessionHandle, TimerError> {
    service
        .active()
        .map(ActiveSession::handle)
        .ok_or(TimerError::State(StateError::InvalidTransition {
            operation,
            state: "idle",
        }))
}

/// Tells the user an event could not be saved.
///
/// Retries once first, since the caller is usually about to exit.
pub fn report_write_error<W: Write, L: EventLog, C: Clock>(
    writer: &mut W,
    service: &mut TimerService<L, C>,
    write_error: Option<impl Display>,
) -> anyhow::Result<()> {
    let Some(err) = write_error else {
        return Ok(());
    };
    if service.flush_pending().is_ok() {
        tracing::debug!(%err, "write succeeded on retry");
        return Ok(());
    }
    writeln!(
        writer,
        "Warning: could not save to the event log ({err}). History may be incomplete."
    )?;
    Ok(())
}

/// Quotes a title for display.
pub fn quoted(title: &str) -> String {
    format!("\"{title}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_minutes() {
        assert_eq!(parse_duration_minutes("25").unwrap(), 25);
        assert_eq!(parse_duration_minutes(" 5 ").unwrap(), 5);
    }

    #[test]
    fn parses_suffixed_durations() {
        assert_eq!(parse_duration_minutes("25m").unwrap(), 25);
        assert_eq!(parse_duration_minutes("2h").unwrap(), 120);
        assert_eq!(parse_duration_minutes("1h30m").unwrap(), 90);
        assert_eq!(parse_duration_minutes("1h 30m").unwrap(), 90);
    }

    #[test]
    fn rejects_garbage_durations() {
        for input in ["", "abc", "-5", "1.5", "m", "30s"] {
            let err = parse_duration_minutes(input).unwrap_err();
            assert!(
                err.to_string().contains("Invalid duration"),
                "unexpected error for {input:?}: {err}"
            );
        }
    }

    #[test]
    fn rejects_overlong_durations() {
        let err = parse_duration_minutes("200h").unwrap_err();
        assert!(err.to_string().contains("Duration too large"));
    }

    #[test]
    fn formats_remaining_as_minutes_and_seconds() {
        assert_eq!(format_remaining(Duration::seconds(0)), "00:00");
        assert_eq!(format_remaining(Duration::seconds(65)), "01:05");
        assert_eq!(format_remaining(Duration::minutes(125)), "125:00");
        assert_eq!(format_remaining(Duration::milliseconds(59_999)), "00:59");
    }

    #[test]
    fn validation_errors_are_always_fatal() {
        let mut out = Vec::new();
        let err = handle_timer_error(
            &mut out,
            TimerError::Validation(ct_core::ValidationError::Empty { field: "title" }),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "title cannot be empty");
    }

    #[test]
    #[cfg(debug_assertions)]
    fn state_errors_are_fatal_in_debug_builds() {
        let mut out = Vec::new();
        let err = handle_timer_error(
            &mut out,
            TimerError::State(StateError::InvalidTransition {
                operation: "stop",
                state: "idle",
            }),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "cannot stop while the timer is idle");
        assert!(out.is_empty());
    }
}
