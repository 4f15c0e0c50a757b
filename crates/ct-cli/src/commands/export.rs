//! Implementation of the `ct export` command.
//!
//! Writes the event log as CSV, one row per event, in the fixed column order
//! `session_id, timestamp, event, title, tags, description, duration_minutes,
//! elapsed_seconds`. `ct import` reads the same layout back.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use ct_core::{Event, EventLog};

/// Column names, in file order.
pub const COLUMNS: [&str; 8] = [
    "session_id",
    "timestamp",
    "event",
    "title",
    "tags",
    "description",
    "duration_minutes",
    "elapsed_seconds",
];

/// One CSV row.
///
/// Every column is kept as text so that rows written by other tools (empty
/// numeric cells, `25.0` for an integer) can be validated field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRecord {
    pub session_id: String,
    pub timestamp: String,
    pub event: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: String,
    #[serde(default)]
    pub elapsed_seconds: String,
}

impl From<&Event> for CsvRecord {
    fn from(event: &Event) -> Self {
        Self {
            session_id: event.session_id.to_string(),
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            event: event.kind.to_string(),
            title: event.title.clone(),
            tags: event.tags.encode(),
            description: event.description.clone(),
            duration_minutes: event.duration_minutes.to_string(),
            elapsed_seconds: event.elapsed_seconds.to_string(),
        }
    }
}

/// Writes every event in `log` as CSV with a header row. Returns the row count.
pub fn run<W: Write, L: EventLog>(writer: W, log: &L) -> Result<usize> {
    let events = log.read_all().context("failed to read event log")?;
    write_events(writer, &events)
}

fn write_events<W: Write>(writer: W, events: &[Event]) -> Result<usize> {
    // The header is written by hand so that an empty log still gets one.
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(COLUMNS)
        .context("failed to write CSV header")?;
    for event in events {
        csv.serialize(CsvRecord::from(event))
            .context("failed to write CSV row")?;
    }
    csv.flush()?;
    Ok(events.len())
}
