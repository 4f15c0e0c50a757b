//! Per-session ordering rules for the event log.
//!
//! A session's events, in append order, must be a prefix of
//!
//! ```text
//! start (stop | finish acknowledge?)?
//! ```

use std::fmt;

use thiserror::Error;

use crate::event_kind::EventKind;

/// How far a session has progressed through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No events recorded yet.
    New,
    Started,
    Stopped,
    Finished,
    Acknowledged,
}

/// An append that would break the session ordering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot record {next} for a session that is {phase}")]
pub struct LifecycleError {
    pub phase: Phase,
    pub next: EventKind,
}

impl Phase {
    /// Replays a session's event kinds from the beginning.
    pub fn replay(kinds: impl IntoIterator<Item = EventKind>) -> Result<Self, LifecycleError> {
        kinds
            .into_iter()
            .try_fold(Self::New, |phase, kind| phase.advance(kind))
    }

    /// Returns the phase after recording `next`.
    pub const fn advance(self, next: EventKind) -> Result<Self, LifecycleError> {
        match (self, next) {
            (Self::New, EventKind::Start) => Ok(Self::Started),
            (Self::Started, EventKind::Stop) => Ok(Self::Stopped),
            (Self::Started, EventKind::Finish) => Ok(Self::Finished),
            (Self::Finished, EventKind::Acknowledge) => Ok(Self::Acknowledged),
            (phase, next) => Err(LifecycleError { phase, next }),
        }
    }

    /// Whether the countdown has ended, one way or another.
    pub const fn is_over(self) -> bool {
        matches!(self, Self::Stopped | Self::Finished | Self::Acknowledged)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Started => "running",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
            Self::Acknowledged => "acknowledged",
        };
        f.write_str(s)
    }
}

/// Checks that `next` may be appended after a session's existing events.
pub fn check_append(
    history: impl IntoIterator<Item = EventKind>,
    next: EventKind,
) -> Result<(), LifecycleError> {
    Phase::replay(history)?.advance(next).map(|_| ())
}
