//! The countdown state machine.
//!
//! ```text
//! Idle --start--> Running --stop----> Idle
//!                    |
//!                    +----finish--> Alarm --acknowledge--> Idle
//! ```
//!
//! Transitions are pure: each returns the [`Event`] that records it and
//! leaves persisting that event to the caller. Elapsed time is always the
//! difference between the wall-clock timestamps captured at `start` and at
//! the terminal transition, so missed ticks never skew it.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{Event, SessionInfo, log_precision};
use crate::event_kind::EventKind;
use crate::lifecycle::Phase;
use crate::types::{SessionId, Tags, ValidationError};

/// User input for a new timer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub title: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: u32,
}

impl StartRequest {
    /// Checks the request and normalizes it into session info.
    pub fn validate(self) -> Result<SessionInfo, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::Empty { field: "title" });
        }
        if self.duration_minutes < 1 {
            return Err(ValidationError::DurationTooShort {
                minutes: self.duration_minutes,
            });
        }
        Ok(SessionInfo {
            title: title.to_string(),
            tags: self.tags,
            description: self.description.trim().to_string(),
            duration_minutes: self.duration_minutes,
        })
    }
}

/// Identifies the session a caller is driving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(SessionId);

impl SessionHandle {
    pub(crate) const fn for_session(session_id: SessionId) -> Self {
        Self(session_id)
    }

    pub const fn session_id(&self) -> &SessionId {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A session that has been started and not yet returned to idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub info: SessionInfo,
}

impl ActiveSession {
    fn new(session_id: SessionId, started_at: DateTime<Utc>, info: SessionInfo) -> Self {
        let ends_at = started_at + Duration::minutes(i64::from(info.duration_minutes));
        Self {
            session_id,
            started_at,
            ends_at,
            info,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::for_session(self.session_id.clone())
    }

    /// Time left on the countdown, clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.ends_at - now).max(Duration::zero())
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "elapsed milliseconds stay far below 2^52"
    )]
    fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - self.started_at).max(Duration::zero());
        elapsed.num_milliseconds() as f64 / 1000.0
    }
}

/// Where the timer currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimerState {
    #[default]
    Idle,
    Running(ActiveSession),
    /// The countdown finished and is waiting to be acknowledged.
    Alarm(ActiveSession),
}

impl TimerState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running(_) => "running",
            Self::Alarm(_) => "alarm",
        }
    }
}

/// A transition was requested from a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("cannot {operation} while the timer is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },
    #[error("session {0} is not the active session")]
    StaleHandle(SessionId),
}

/// Errors from driving the timer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// One timer's lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerSession {
    state: TimerState,
}

impl TimerSession {
    pub const fn new() -> Self {
        Self {
            state: TimerState::Idle,
        }
    }

    /// Rebuilds the timer from the log.
    ///
    /// The most recently started session decides the state: running if it
    /// has no terminal event, alarm if it finished but was never
    /// acknowledged, idle otherwise.
    pub fn restore(events: &[Event]) -> Self {
        let Some(start) = events.iter().rev().find(|e| e.kind == EventKind::Start) else {
            return Self::new();
        };
        let kinds = events
            .iter()
            .filter(|e| e.session_id == start.session_id)
            .map(|e| e.kind);
        let phase = replay_lenient(kinds);

        let Some(info) = start.info() else {
            return Self::new();
        };
        let active = ActiveSession::new(start.session_id.clone(), start.timestamp, info);
        let state = match phase {
            Phase::Started => TimerState::Running(active),
            Phase::Finished => TimerState::Alarm(active),
            _ => TimerState::Idle,
        };
        tracing::debug!(state = state.name(), session_id = %start.session_id, "restored timer");
        Self { state }
    }

    pub const fn state(&self) -> &TimerState {
        &self.state
    }

    /// The running or alarming session, if any.
    pub const fn active(&self) -> Option<&ActiveSession> {
        match &self.state {
            TimerState::Idle => None,
            TimerState::Running(active) | TimerState::Alarm(active) => Some(active),
        }
    }

    pub fn start(&mut self, request: StartRequest, now: DateTime<Utc>) -> Result<Event, TimerError> {
        if !matches!(self.state, TimerState::Idle) {
            return Err(self.invalid("start").into());
        }
        let info = request.validate()?;
        let now = log_precision(now);
        let active = ActiveSession::new(SessionId::generate(), now, info);
        let event = Event::start(active.session_id.clone(), now, &active.info);
        self.state = TimerState::Running(active);
        Ok(event)
    }

    /// Computes the remaining countdown without changing anything.
    ///
    /// A zero result means the caller should [`finish`](Self::finish).
    pub fn tick(&self, now: DateTime<Utc>) -> Result<Duration, StateError> {
        match &self.state {
            TimerState::Running(active) => Ok(active.remaining(now)),
            _ => Err(self.invalid("tick")),
        }
    }

    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<Event, StateError> {
        let TimerState::Running(active) = &self.state else {
            return Err(self.invalid("stop"));
        };
        let now = log_precision(now);
        let event = Event::stop(active.session_id.clone(), now, active.elapsed_seconds(now));
        self.state = TimerState::Idle;
        Ok(event)
    }

    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<Event, StateError> {
        let TimerState::Running(active) = &self.state else {
            return Err(self.invalid("finish"));
        };
        let now = log_precision(now);
        let event = Event::finish(active.session_id.clone(), now, active.elapsed_seconds(now));
        self.state = TimerState::Alarm(active.clone());
        Ok(event)
    }

    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> Result<Event, StateError> {
        let TimerState::Alarm(active) = &self.state else {
            return Err(self.invalid("acknowledge"));
        };
        let event = Event::acknowledge(active.session_id.clone(), now);
        self.state = TimerState::Idle;
        Ok(event)
    }

    /// Checks that `handle` names the active session.
    pub fn check_handle(&self, handle: &SessionHandle) -> Result<&ActiveSession, StateError> {
        match self.active() {
            Some(active) if active.session_id == handle.0 => Ok(active),
            _ => Err(StateError::StaleHandle(handle.0.clone())),
        }
    }

    const fn invalid(&self, operation: &'static str) -> StateError {
        StateError::InvalidTransition {
            operation,
            state: self.state.name(),
        }
    }
}

/// Replays kinds up to the first one that breaks the lifecycle.
fn replay_lenient(kinds: impl IntoIterator<Item = EventKind>) -> Phase {
    let mut phase = Phase::New;
    for kind in kinds {
        match phase.advance(kind) {
            Ok(next) => phase = next,
            Err(err) => {
                tracing::warn!(%err, "ignoring out-of-order event while restoring");
                break;
            }
        }
    }
    phase
}
