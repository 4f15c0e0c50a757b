//! Storage layer for the countdown timer.
//!
//! Provides the durable [`EventLog`] using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Separate processes may
//! open the same file; SQLite serializes their writes.
//!
//! # Schema
//!
//! One flat `events` table, one row per lifecycle event, columns in the fixed
//! order `session_id, timestamp, event, title, tags, description,
//! duration_minutes, elapsed_seconds`. An autoincrement `seq` column records
//! append order. Triggers reject `UPDATE` and `DELETE`, so the table is
//! append-only.
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). This ensures:
//! - Lexicographic ordering matches chronological ordering
//! - Human-readable values in the database
//! - Timezone-aware (always UTC)
//!
//! ## Tags
//!
//! Tags are flattened to a single comma-and-space separated column
//! (`"a, b, c"`), empty when a session has none.
//!
//! # Malformed Rows
//!
//! A row that can't be turned back into an [`Event`] (say, one edited by hand)
//! is logged and left out of [`EventLog::read_all`] rather than failing it.
//!
//! # Durability
//!
//! The database runs in WAL mode with `synchronous = FULL`. Each append is its
//! own immediate transaction: once [`EventLog::append`] returns, the row is on
//! disk; if it fails, nothing was written, and readers never see a partial row.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, TransactionBehavior, params};
use thiserror::Error;

use ct_core::lifecycle::{self, LifecycleError};
use ct_core::{Event, EventKind, EventLog, SessionId, Tags, UnknownEventKind};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The append would break the session's event ordering.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for event {seq}: {timestamp}")]
    TimestampParse {
        seq: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row has an unknown event kind.
    #[error("invalid event kind for event {seq}")]
    InvalidEventKind {
        seq: i64,
        #[source]
        source: UnknownEventKind,
    },
    /// A stored row has values that don't fit the event model.
    #[error("invalid event data for {seq}: {message}")]
    InvalidEventData { seq: i64, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An event row as stored.
struct EventRow {
    seq: i64,
    session_id: String,
    timestamp: String,
    kind: String,
    title: String,
    tags: String,
    description: String,
    duration_minutes: i64,
    elapsed_seconds: f64,
}

const SELECT_EVENTS: &str = "
    SELECT seq, session_id, timestamp, event, title, tags, description, duration_minutes, elapsed_seconds
    FROM events
";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let db = Self {
            conn: Connection::open(path)?,
        };
        db.configure()?;
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.configure()?;
        db.init()?;
        Ok(db)
    }

    fn configure(&self) -> Result<(), DbError> {
        let mode: String =
            self.conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "configured database");
        self.conn.pragma_update(None, "synchronous", "FULL")?;
        Ok(())
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Events table: one row per timer lifecycle event, never rewritten
            -- timestamp: RFC 3339 format (e.g., '2024-01-15T10:30:00.000Z')
            -- tags: comma-and-space joined (e.g., 'deep-work, writing')
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL CHECK (session_id <> ''),
                timestamp TEXT NOT NULL,
                event TEXT NOT NULL CHECK (event IN ('start', 'stop', 'finish', 'acknowledge')),
                title TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                duration_minutes INTEGER NOT NULL DEFAULT 0,
                elapsed_seconds REAL NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_events_session ON events(session_id);

            CREATE TRIGGER IF NOT EXISTS events_no_update
            BEFORE UPDATE ON events
            BEGIN
                SELECT RAISE(ABORT, 'events are append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS events_no_delete
            BEFORE DELETE ON events
            BEGIN
                SELECT RAISE(ABORT, 'events are append-only');
            END;
            ",
        )?;
        Ok(())
    }

    fn query_events<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(EventRow {
                seq: row.get(0)?,
                session_id: row.get(1)?,
                timestamp: row.get(2)?,
                kind: row.get(3)?,
                title: row.get(4)?,
                tags: row.get(5)?,
                description: row.get(6)?,
                duration_minutes: row.get(7)?,
                elapsed_seconds: row.get(8)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            match row?.into_event() {
                Ok(event) => events.push(event),
                Err(err) => tracing::warn!(error = %err, "skipping malformed event row"),
            }
        }
        Ok(events)
    }
}

impl EventLog for Database {
    type Error = DbError;

    fn ensure_initialized(&mut self) -> Result<(), DbError> {
        self.init()
    }

    fn append(&mut self, event: &Event) -> Result<(), DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt =
                tx.prepare("SELECT event FROM events WHERE session_id = ? ORDER BY seq ASC")?;
            let rows = stmt.query_map([event.session_id.as_str()], |row| row.get::<_, String>(0))?;
            let mut history = Vec::new();
            for row in rows {
                // Unknown kinds can't be written through this type, but an
                // externally edited file could contain them.
                if let Ok(kind) = row?.parse::<EventKind>() {
                    history.push(kind);
                }
            }
            lifecycle::check_append(history, event.kind)?;

            tx.execute(
                "
                INSERT INTO events
                (session_id, timestamp, event, title, tags, description, duration_minutes, elapsed_seconds)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
                params![
                    event.session_id.as_str(),
                    format_timestamp(event.timestamp),
                    event.kind.as_str(),
                    event.title,
                    event.tags.encode(),
                    event.description,
                    i64::from(event.duration_minutes),
                    event.elapsed_seconds,
                ],
            )?;
        }
        tx.commit()?;
        tracing::debug!(session_id = %event.session_id, kind = %event.kind, "appended event");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Event>, DbError> {
        let sql = format!("{SELECT_EVENTS} ORDER BY seq ASC");
        self.query_events(&sql, [])
    }

    fn is_rejection(error: &DbError) -> bool {
        matches!(error, DbError::Lifecycle(_))
    }
}

impl EventRow {
    fn into_event(self) -> Result<Event, DbError> {
        let seq = self.seq;
        let session_id = SessionId::new(self.session_id).map_err(|e| DbError::InvalidEventData {
            seq,
            message: e.to_string(),
        })?;
        let kind = self
            .kind
            .parse()
            .map_err(|source| DbError::InvalidEventKind { seq, source })?;
        let duration_minutes =
            u32::try_from(self.duration_minutes).map_err(|_| DbError::InvalidEventData {
                seq,
                message: format!("duration_minutes out of range: {}", self.duration_minutes),
            })?;
        Ok(Event {
            session_id,
            timestamp: parse_timestamp(&self.timestamp, seq)?,
            kind,
            title: self.title,
            tags: Tags::decode(&self.tags),
            description: self.description,
            duration_minutes,
            elapsed_seconds: self.elapsed_seconds,
        })
    }
}

fn parse_timestamp(timestamp: &str, seq: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            seq,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
