//! Core domain logic for the countdown timer.
//!
//! This crate contains:
//! - Events: the immutable records of a timer's lifecycle and their ordering rules
//! - The event log abstraction every other view is derived from
//! - The countdown state machine and the service API that persists it
//! - Session summaries and tag suggestions computed from the log

pub mod clock;
pub mod event;
pub mod event_kind;
pub mod lifecycle;
pub mod log;
pub mod service;
pub mod summary;
pub mod timer;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{Event, SessionInfo};
pub use event_kind::{EventKind, UnknownEventKind};
pub use lifecycle::{LifecycleError, Phase};
pub use log::{EventLog, MemoryLog, MemoryLogError};
pub use service::{Outcome, TimerService};
pub use summary::{SessionStatus, SessionSummary, all_tags, summarize};
pub use timer::{
    ActiveSession, SessionHandle, StartRequest, StateError, TimerError, TimerSession, TimerState,
};
pub use types::{SessionId, Tags, ValidationError};
