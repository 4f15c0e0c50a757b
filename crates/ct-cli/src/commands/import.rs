//! Import command for appending events from a CSV log.
//!
//! Accepts the layout written by `ct export` as well as logs written by
//! other tools in the same column order, where timestamps may lack an
//! offset (read as UTC) and numeric cells may be empty or `25.0`.

use std::io::{Read, Write};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDateTime, Utc};

use ct_core::event::log_precision;
use ct_core::{Event, EventKind, EventLog, SessionId, Tags};
use ct_db::{Database, DbError};

use crate::commands::export::CsvRecord;

/// Timestamp layouts accepted besides RFC 3339, all read as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Counts from one import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Appends every valid row of `reader` to `db`.
///
/// Rows that can't be parsed, or that the log rejects as out of order for
/// their session, are reported to `writer` and skipped. Running the same
/// import twice therefore adds nothing the second time.
pub fn run<W: Write, R: Read>(writer: &mut W, reader: R, db: &mut Database) -> Result<ImportSummary> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut summary = ImportSummary::default();

    for (idx, row) in csv.deserialize::<CsvRecord>().enumerate() {
        let row_number = idx + 1;
        let record = match row {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err).context("failed to read CSV"),
            Err(err) => {
                summary.skipped += 1;
                writeln!(writer, "Skipped row {row_number}: {err}")?;
                continue;
            }
        };
        let event = match record.into_event() {
            Ok(event) => event,
            Err(err) => {
                summary.skipped += 1;
                writeln!(writer, "Skipped row {row_number}: {err:#}")?;
                continue;
            }
        };

        match db.append(&event) {
            Ok(()) => summary.imported += 1,
            Err(DbError::Lifecycle(err)) => {
                summary.skipped += 1;
                writeln!(writer, "Skipped row {row_number}: {err}")?;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to import row {row_number}"));
            }
        }
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "import finished"
    );
    writeln!(
        writer,
        "Imported {} events, skipped {}.",
        summary.imported, summary.skipped
    )?;
    Ok(summary)
}

impl CsvRecord {
    /// Validates the row and converts it to an event.
    pub fn into_event(self) -> Result<Event> {
        let session_id = SessionId::new(self.session_id.trim())?;
        let timestamp = parse_timestamp(&self.timestamp)?;
        let kind: EventKind = self.event.trim().parse()?;
        let duration_minutes =
            parse_minutes(&self.duration_minutes).context("invalid duration_minutes")?;
        let elapsed_seconds =
            parse_seconds(&self.elapsed_seconds).context("invalid elapsed_seconds")?;

        if kind == EventKind::Start {
            if self.title.trim().is_empty() {
                bail!("start event has no title");
            }
            if duration_minutes < 1 {
                bail!("start event has no duration");
            }
        }

        Ok(Event {
            session_id,
            timestamp: log_precision(timestamp),
            kind,
            title: self.title,
            tags: Tags::decode(&self.tags),
            description: self.description,
            duration_minutes,
            elapsed_seconds,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .with_context(|| format!("invalid timestamp: {value:?}"))
}

/// Parses a whole number of minutes; empty means zero.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is checked to be a whole number within u32 range first"
)]
fn parse_minutes(value: &str) -> Result<u32> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    if let Ok(minutes) = value.parse::<u32>() {
        return Ok(minutes);
    }
    let float: f64 = value
        .parse()
        .with_context(|| format!("not a number: {value:?}"))?;
    if float.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&float) {
        bail!("not a whole number of minutes: {value:?}");
    }
    Ok(float as u32)
}

/// Parses non-negative fractional seconds; empty means zero.
fn parse_seconds(value: &str) -> Result<f64> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0.0);
    }
    let seconds: f64 = value
        .parse()
        .with_context(|| format!("not a number: {value:?}"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        bail!("out of range: {value:?}");
    }
    Ok(seconds)
}
