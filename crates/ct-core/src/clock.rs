//! Wall-clock abstraction so countdowns can be driven without real waits.

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, Utc};

/// Source of wall-clock time for the timer.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Blocks the countdown loop between polls.
    fn sleep(&self, duration: std::time::Duration);
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: std::time::Duration) {
        std::thread::sleep(duration);
    }
}

/// A hand-driven clock for tests.
///
/// Clones share the same time, so a test can keep a handle while a
/// [`TimerService`](crate::TimerService) owns another. `sleep` advances the
/// clock instead of blocking.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: std::time::Duration) {
        if let Ok(by) = chrono::Duration::from_std(duration) {
            self.advance(by);
        }
    }
}
