//! Derives per-session summaries and tag suggestions from the raw log.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::Event;
use crate::event_kind::EventKind;
use crate::types::{SessionId, Tags};

/// Shown instead of an elapsed time while a session has no terminal event.
pub const IN_PROGRESS: &str = "In Progress";

/// How a session ended, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Stopped,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Stopped => "Stopped",
        };
        f.write_str(s)
    }
}

/// A read-only view over one session's events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub title: String,
    pub tags: Tags,
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Elapsed seconds from the terminal event.
    pub elapsed_seconds: Option<f64>,
    pub acknowledged: bool,
}

impl SessionSummary {
    /// The elapsed time as `"Xm Ys"`, or [`IN_PROGRESS`].
    pub fn actual_elapsed(&self) -> String {
        self.elapsed_seconds
            .map_or_else(|| IN_PROGRESS.to_string(), format_elapsed)
    }
}

/// Formats seconds as whole minutes and seconds, e.g. `"1m 5s"`.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is floored and clamped to be non-negative first"
)]
pub fn format_elapsed(seconds: f64) -> String {
    let whole = seconds.max(0.0).floor() as u64;
    format!("{}m {}s", whole / 60, whole % 60)
}

/// Summarizes every session in the log, most recently started first.
///
/// Groups without a `start` event are skipped. The first terminal event of a
/// group decides its status.
pub fn summarize(events: &[Event]) -> Vec<SessionSummary> {
    let mut summaries: Vec<SessionSummary> = group_by_session(events)
        .into_iter()
        .filter_map(|(session_id, group)| summarize_group(session_id, &group))
        .collect();
    summaries.reverse();
    summaries
}

fn summarize_group(session_id: &SessionId, group: &[&Event]) -> Option<SessionSummary> {
    let Some(start) = group.iter().find(|e| e.kind == EventKind::Start) else {
        tracing::debug!(%session_id, "skipping session without a start event");
        return None;
    };
    let terminal = group.iter().find(|e| e.kind.is_terminal());
    let status = match terminal.map(|e| e.kind) {
        Some(EventKind::Finish) => SessionStatus::Completed,
        Some(_) => SessionStatus::Stopped,
        None => SessionStatus::Running,
    };

    Some(SessionSummary {
        session_id: session_id.clone(),
        title: start.title.clone(),
        tags: start.tags.clone(),
        duration_minutes: start.duration_minutes,
        started_at: start.timestamp,
        status,
        elapsed_seconds: terminal.map(|e| e.elapsed_seconds),
        acknowledged: group.iter().any(|e| e.kind == EventKind::Acknowledge),
    })
}

/// Groups events by session, keeping first-seen order of session IDs.
///
/// Sessions are ordered by the position of their first event, which for a
/// well-formed log is their `start`.
fn group_by_session(events: &[Event]) -> Vec<(&SessionId, Vec<&Event>)> {
    let mut index: HashMap<&SessionId, usize> = HashMap::new();
    let mut groups: Vec<(&SessionId, Vec<&Event>)> = Vec::new();
    for event in events {
        let slot = *index.entry(&event.session_id).or_insert_with(|| {
            groups.push((&event.session_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(event);
    }
    groups
}

/// Every distinct tag used by any session, sorted.
pub fn all_tags(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::Start)
        .flat_map(|e| e.tags.iter())
        .filter(|tag| !tag.is_empty())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
