//! Sessions command for listing past timer sessions.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;
use serde::Serialize;

use ct_core::{Clock, EventLog, SessionSummary, TimerService};

const TITLE_WIDTH: usize = 24;

/// Session summary with the rendered elapsed time.
#[derive(Debug, Serialize)]
pub struct JsonSession<'a> {
    #[serde(flatten)]
    pub summary: &'a SessionSummary,
    pub actual_elapsed: String,
}

pub fn run<W: Write, L: EventLog, C: Clock, Tz: TimeZone>(
    writer: &mut W,
    service: &TimerService<L, C>,
    json: bool,
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: Display,
{
    let sessions = service.list_past_sessions()?;
    if json {
        writeln!(writer, "{}", format_sessions_json(&sessions)?)?;
    } else {
        write_sessions(writer, &sessions, tz)?;
    }
    Ok(())
}

/// Writes sessions as a table, most recent first.
pub fn write_sessions<W: Write, Tz: TimeZone>(
    writer: &mut W,
    sessions: &[SessionSummary],
    tz: &Tz,
) -> Result<()>
where
    Tz::Offset: Display,
{
    if sessions.is_empty() {
        writeln!(
            writer,
            "No past timer sessions found. Start one with `ct start`."
        )?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<16}  {:<24}  {:>7}  {:<9}  {:>11}  Tags",
        "Started", "Title", "Planned", "Status", "Elapsed"
    )?;
    writeln!(
        writer,
        "────────────────  ────────────────────────  ───────  ─────────  ───────────  ────────────"
    )?;

    for session in sessions {
        let started = session
            .started_at
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        // Truncate by characters, not bytes, to avoid panics on multi-byte UTF-8
        let title = if session.title.chars().count() > TITLE_WIDTH {
            format!(
                "{}...",
                session.title.chars().take(TITLE_WIDTH - 3).collect::<String>()
            )
        } else {
            session.title.clone()
        };
        let planned = format!("{}m", session.duration_minutes);
        let status = session.status.to_string();
        let line = format!(
            "{started:<16}  {title:<24}  {planned:>7}  {status:<9}  {:>11}  {}",
            session.actual_elapsed(),
            session.tags
        );
        writeln!(writer, "{}", line.trim_end())?;
    }
    Ok(())
}

/// Formats sessions as pretty-printed JSON.
pub fn format_sessions_json(sessions: &[SessionSummary]) -> Result<String> {
    let rows: Vec<JsonSession<'_>> = sessions
        .iter()
        .map(|summary| JsonSession {
            summary,
            actual_elapsed: summary.actual_elapsed(),
        })
        .collect();
    serde_json::to_string_pretty(&rows).context("failed to serialize sessions")
}
