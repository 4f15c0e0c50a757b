//! The append-only event log abstraction.

use std::cell::Cell;

use thiserror::Error;

use crate::event::Event;
use crate::lifecycle::{self, LifecycleError};

/// Durable, append-only storage for lifecycle events.
///
/// The log is the single source of truth: sessions, tags and the active
/// timer are all recomputed from [`EventLog::read_all`].
pub trait EventLog {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates an empty log if none exists. Idempotent.
    fn ensure_initialized(&mut self) -> Result<(), Self::Error>;

    /// Adds one event to the end of the log.
    ///
    /// On success the event has reached stable storage. On failure the log is
    /// left exactly as it was before the call.
    fn append(&mut self, event: &Event) -> Result<(), Self::Error>;

    /// Returns every event in append order.
    fn read_all(&self) -> Result<Vec<Event>, Self::Error>;

    /// Whether `error` means the log refused the event because it breaks the
    /// session's ordering, as opposed to a storage failure worth retrying.
    fn is_rejection(error: &Self::Error) -> bool;
}

/// Errors from [`MemoryLog`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryLogError {
    /// A failure injected with [`MemoryLog::fail_next_appends`] or
    /// [`MemoryLog::fail_next_reads`].
    #[error("log unavailable")]
    Unavailable,
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// An in-process event log.
///
/// Applies the same ordering rules as the on-disk log and can simulate
/// storage failures.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    events: Vec<Event>,
    failing_appends: usize,
    failing_reads: Cell<usize>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` appends fail without writing anything.
    pub const fn fail_next_appends(&mut self, count: usize) {
        self.failing_appends = count;
    }

    /// Makes the next `count` reads fail.
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.set(count);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl EventLog for MemoryLog {
    type Error = MemoryLogError;

    fn ensure_initialized(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn append(&mut self, event: &Event) -> Result<(), Self::Error> {
        if self.failing_appends > 0 {
            self.failing_appends -= 1;
            return Err(MemoryLogError::Unavailable);
        }
        let history = self
            .events
            .iter()
            .filter(|e| e.session_id == event.session_id)
            .map(|e| e.kind);
        lifecycle::check_append(history, event.kind)?;
        self.events.push(event.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Event>, Self::Error> {
        let failing = self.failing_reads.get();
        if failing > 0 {
            self.failing_reads.set(failing - 1);
            return Err(MemoryLogError::Unavailable);
        }
        Ok(self.events.clone())
    }

    fn is_rejection(error: &Self::Error) -> bool {
        matches!(error, MemoryLogError::Lifecycle(_))
    }
}
