//! Lifecycle events as they are recorded in the log.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::event_kind::EventKind;
use crate::types::{SessionId, Tags};

/// What the user asked for when starting a timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub title: String,
    pub tags: Tags,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: u32,
}

/// An immutable record of one lifecycle transition.
///
/// `title`, `tags`, `description` and `duration_minutes` are only populated on
/// `start`; `elapsed_seconds` only on `stop` and `finish`. Unused fields hold
/// their empty/zero value, matching the flat column layout of the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "event")]
    pub kind: EventKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub elapsed_seconds: f64,
}

impl Event {
    fn bare(session_id: SessionId, timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            session_id,
            timestamp: log_precision(timestamp),
            kind,
            title: String::new(),
            tags: Tags::new(),
            description: String::new(),
            duration_minutes: 0,
            elapsed_seconds: 0.0,
        }
    }

    pub fn start(session_id: SessionId, timestamp: DateTime<Utc>, info: &SessionInfo) -> Self {
        Self {
            title: info.title.clone(),
            tags: info.tags.clone(),
            description: info.description.clone(),
            duration_minutes: info.duration_minutes,
            ..Self::bare(session_id, timestamp, EventKind::Start)
        }
    }

    pub fn stop(session_id: SessionId, timestamp: DateTime<Utc>, elapsed_seconds: f64) -> Self {
        Self {
            elapsed_seconds,
            ..Self::bare(session_id, timestamp, EventKind::Stop)
        }
    }

    pub fn finish(session_id: SessionId, timestamp: DateTime<Utc>, elapsed_seconds: f64) -> Self {
        Self {
            elapsed_seconds,
            ..Self::bare(session_id, timestamp, EventKind::Finish)
        }
    }

    pub fn acknowledge(session_id: SessionId, timestamp: DateTime<Utc>) -> Self {
        Self::bare(session_id, timestamp, EventKind::Acknowledge)
    }

    /// The session info carried by a `start` event.
    pub fn info(&self) -> Option<SessionInfo> {
        (self.kind == EventKind::Start).then(|| SessionInfo {
            title: self.title.clone(),
            tags: self.tags.clone(),
            description: self.description.clone(),
            duration_minutes: self.duration_minutes,
        })
    }
}

/// Truncates a timestamp to the millisecond precision the log stores.
pub fn log_precision(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(3)
}
