//! The timer API used by presentation layers.
//!
//! [`TimerService`] ties a [`TimerSession`] to an [`EventLog`] and a
//! [`Clock`]. A transition always takes effect in memory; if its event
//! cannot be written, the event is queued and retried, in order, before the
//! next write, and the caller gets the write error back as a warning.
//!
//! Another process may record a conflicting event for the same session first
//! (both finishing it, or one stopping while the other finishes). The log
//! rejects the later one; that event is dropped and the timer is re-derived
//! from the log, which already holds the winning transition.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::event::Event;
use crate::log::EventLog;
use crate::summary::{self, SessionSummary};
use crate::timer::{ActiveSession, SessionHandle, StartRequest, TimerError, TimerSession};

/// The result of a transition that has taken effect.
#[derive(Debug)]
#[must_use]
pub struct Outcome<T, E> {
    pub value: T,
    /// Set when the transition's event could not be written yet.
    pub write_error: Option<E>,
    /// Set when the log already held a conflicting event for the session.
    /// The timer now reflects the log instead of this transition.
    pub superseded: bool,
}

type AlarmHook = Box<dyn FnMut(&ActiveSession)>;

/// Drives one timer against a durable log.
pub struct TimerService<L, C> {
    log: L,
    clock: C,
    timer: TimerSession,
    pending: VecDeque<Event>,
    rejected: Vec<Event>,
    alarm_hook: Option<AlarmHook>,
}

impl<L: EventLog, C: Clock> TimerService<L, C> {
    /// Initializes the log and resumes whatever session it left active.
    pub fn open(mut log: L, clock: C) -> Result<Self, L::Error> {
        log.ensure_initialized()?;
        let timer = TimerSession::restore(&log.read_all()?);
        Ok(Self {
            log,
            clock,
            timer,
            pending: VecDeque::new(),
            rejected: Vec::new(),
            alarm_hook: None,
        })
    }

    /// Registers the hook called once when a countdown reaches zero.
    pub fn on_alarm(&mut self, hook: impl FnMut(&ActiveSession) + 'static) {
        self.alarm_hook = Some(Box::new(hook));
    }

    pub const fn timer(&self) -> &TimerSession {
        &self.timer
    }

    pub const fn active(&self) -> Option<&ActiveSession> {
        self.timer.active()
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn log(&self) -> &L {
        &self.log
    }

    pub fn into_log(self) -> L {
        self.log
    }

    /// Tag suggestions from every session so far.
    pub fn list_all_tags(&self) -> Result<Vec<String>, L::Error> {
        Ok(summary::all_tags(&self.history()?))
    }

    /// Summaries of every session, most recent first.
    pub fn list_past_sessions(&self) -> Result<Vec<SessionSummary>, L::Error> {
        Ok(summary::summarize(&self.history()?))
    }

    pub fn start_timer(
        &mut self,
        request: StartRequest,
    ) -> Result<Outcome<SessionHandle, L::Error>, TimerError> {
        let event = self.timer.start(request, self.clock.now())?;
        let handle = SessionHandle::for_session(event.session_id.clone());
        tracing::info!(session_id = %handle, title = %event.title, "timer started");
        Ok(self.record(event, handle))
    }

    /// Time left on the countdown. Never writes to the log.
    pub fn poll_remaining(
        &self,
        handle: &SessionHandle,
        now: DateTime<Utc>,
    ) -> Result<Duration, TimerError> {
        self.timer.check_handle(handle)?;
        Ok(self.timer.tick(now)?)
    }

    pub fn stop_timer(
        &mut self,
        handle: &SessionHandle,
        now: DateTime<Utc>,
    ) -> Result<Outcome<(), L::Error>, TimerError> {
        self.timer.check_handle(handle)?;
        let event = self.timer.stop(now)?;
        tracing::info!(session_id = %handle, elapsed = event.elapsed_seconds, "timer stopped");
        Ok(self.record(event, ()))
    }

    /// Ends a countdown that ran out and fires the alarm hook.
    ///
    /// The hook is skipped when another process already ended the session.
    pub fn finish_timer(
        &mut self,
        handle: &SessionHandle,
        now: DateTime<Utc>,
    ) -> Result<Outcome<(), L::Error>, TimerError> {
        self.timer.check_handle(handle)?;
        let event = self.timer.finish(now)?;
        tracing::info!(session_id = %handle, elapsed = event.elapsed_seconds, "timer finished");
        let outcome = self.record(event, ());
        if outcome.superseded {
            return Ok(outcome);
        }
        if let (Some(hook), Some(active)) = (self.alarm_hook.as_mut(), self.timer.active()) {
            hook(active);
        }
        Ok(outcome)
    }

    pub fn acknowledge(
        &mut self,
        handle: &SessionHandle,
    ) -> Result<Outcome<(), L::Error>, TimerError> {
        self.timer.check_handle(handle)?;
        let event = self.timer.acknowledge(self.clock.now())?;
        tracing::info!(session_id = %handle, "alarm acknowledged");
        Ok(self.record(event, ()))
    }

    /// Re-derives the timer from the log, picking up changes made elsewhere.
    ///
    /// While writes are still pending the log is behind this process, so the
    /// in-memory state is kept.
    pub fn refresh(&mut self) -> Result<(), L::Error> {
        if self.flush_pending().is_err() {
            tracing::debug!(pending = self.pending.len(), "log behind, keeping local state");
            return Ok(());
        }
        self.timer = TimerSession::restore(&self.log.read_all()?);
        Ok(())
    }

    /// Number of events waiting to be written.
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Retries queued writes in order, stopping at the first storage failure.
    ///
    /// Events the log rejects are dropped, and once the queue is empty the
    /// timer is re-derived from the log.
    pub fn flush_pending(&mut self) -> Result<(), L::Error> {
        let mut resync = false;
        while let Some(event) = self.pending.front() {
            match self.log.append(event) {
                Ok(()) => {
                    tracing::debug!(session_id = %event.session_id, kind = %event.kind, "event written");
                }
                Err(err) if L::is_rejection(&err) => {
                    tracing::warn!(
                        error = %err,
                        session_id = %event.session_id,
                        kind = %event.kind,
                        "log already moved on, dropping event"
                    );
                    self.rejected.push(event.clone());
                    resync = true;
                }
                Err(err) => return Err(err),
            }
            self.pending.pop_front();
        }
        if resync {
            self.resync();
        }
        Ok(())
    }

    fn resync(&mut self) {
        match self.log.read_all() {
            Ok(events) => self.timer = TimerSession::restore(&events),
            Err(err) => tracing::warn!(error = %err, "failed to re-read log, keeping local state"),
        }
    }

    fn record<T>(&mut self, event: Event, value: T) -> Outcome<T, L::Error> {
        self.pending.push_back(event.clone());
        let write_error = self.flush_pending().err();
        if let Some(err) = &write_error {
            tracing::warn!(
                error = %err,
                pending = self.pending.len(),
                "failed to write event, will retry"
            );
        }
        let superseded = self.rejected.contains(&event);
        self.rejected.clear();
        Outcome {
            value,
            write_error,
            superseded,
        }
    }

    fn history(&self) -> Result<Vec<Event>, L::Error> {
        let mut events = self.log.read_all()?;
        events.extend(self.pending.iter().cloned());
        Ok(events)
    }
}

impl<L, C> fmt::Debug for TimerService<L, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerService")
            .field("timer", &self.timer)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::TimeZone;

    use crate::clock::ManualClock;
    use crate::event_kind::EventKind;
    use crate::log::{MemoryLog, MemoryLogError};
    use crate::summary::SessionStatus;
    use crate::timer::{StateError, TimerState};
    use crate::types::ValidationError;

    fn service() -> (TimerService<MemoryLog, ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 5, 14, 0, 0).unwrap());
        let service = TimerService::open(MemoryLog::new(), clock.clone()).unwrap();
        (service, clock)
    }

    fn request(title: &str, tags: &[&str], minutes: u32) -> StartRequest {
        StartRequest {
            title: title.to_string(),
            tags: tags.iter().collect(),
            description: String::new(),
            duration_minutes: minutes,
        }
    }

    fn kinds(log: &MemoryLog) -> Vec<EventKind> {
        log.events().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn start_appends_exactly_one_start_event() {
        let (mut service, _clock) = service();
        let outcome = service
            .start_timer(request("Write report", &["work"], 25))
            .unwrap();

        assert!(outcome.write_error.is_none());
        assert_eq!(kinds(service.log()), [EventKind::Start]);
        assert!(matches!(service.timer().state(), TimerState::Running(_)));
        assert_eq!(
            service.active().unwrap().session_id,
            *outcome.value.session_id()
        );
    }

    #[test]
    fn empty_title_is_rejected_and_log_unchanged() {
        let (mut service, _clock) = service();
        let err = service.start_timer(request("", &[], 25)).unwrap_err();

        assert_eq!(
            err,
            TimerError::Validation(ValidationError::Empty { field: "title" })
        );
        assert!(service.log().events().is_empty());
        assert_eq!(service.timer().state(), &TimerState::Idle);
    }

    #[test]
    fn stop_after_five_seconds_summarizes_as_stopped() {
        let (mut service, clock) = service();
        let handle = service
            .start_timer(request("Write report", &["work"], 25))
            .unwrap()
            .value;

        clock.advance(Duration::seconds(5));
        let _ = service.stop_timer(&handle, clock.now()).unwrap();

        let sessions = service.list_past_sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].status, SessionStatus::Stopped);
        assert_eq!(sessions[0].actual_elapsed(), "0m 5s");
        assert_eq!(service.timer().state(), &TimerState::Idle);
    }

    #[test]
    fn full_countdown_records_start_finish_acknowledge() {
        let (mut service, clock) = service();
        let handle = service
            .start_timer(request("Stretch", &[], 1))
            .unwrap()
            .value;

        clock.advance(Duration::seconds(60));
        assert_eq!(
            service.poll_remaining(&handle, clock.now()).unwrap(),
            Duration::zero()
        );
        let _ = service.finish_timer(&handle, clock.now()).unwrap();
        let _ = service.acknowledge(&handle).unwrap();

        let events = service.log().events();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.session_id == *handle.session_id()));
        assert_eq!(
            kinds(service.log()),
            [EventKind::Start, EventKind::Finish, EventKind::Acknowledge]
        );
        assert!((events[1].elapsed_seconds - 60.0).abs() < f64::EPSILON);
        assert_eq!(service.timer().state(), &TimerState::Idle);
        assert_eq!(
            service.list_past_sessions().unwrap()[0].status,
            SessionStatus::Completed
        );
    }

    #[test]
    fn poll_remaining_never_writes() {
        let (mut service, clock) = service();
        let handle = service
            .start_timer(request("Focus", &[], 10))
            .unwrap()
            .value;

        for _ in 0..5 {
            clock.sleep(std::time::Duration::from_secs(1));
            service.poll_remaining(&handle, clock.now()).unwrap();
        }
        assert_eq!(service.log().events().len(), 1);
        assert_eq!(
            service.poll_remaining(&handle, clock.now()).unwrap(),
            Duration::seconds(595)
        );
    }

    #[test]
    fn alarm_hook_fires_exactly_once() {
        let (mut service, clock) = service();
        let fired = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&fired);
        service.on_alarm(move |active| seen.borrow_mut().push(active.info.title.clone()));

        let handle = service
            .start_timer(request("Tea", &[], 3))
            .unwrap()
            .value;
        clock.advance(Duration::minutes(3));
        let _ = service.finish_timer(&handle, clock.now()).unwrap();
        assert!(service.finish_timer(&handle, clock.now()).is_err());
        let _ = service.acknowledge(&handle).unwrap();

        assert_eq!(*fired.borrow(), ["Tea"]);
    }

    #[test]
    fn stopping_does_not_fire_alarm() {
        let (mut service, clock) = service();
        let fired = Rc::new(RefCell::new(0));
        let count = Rc::clone(&fired);
        service.on_alarm(move |_| *count.borrow_mut() += 1);

        let handle = service
            .start_timer(request("Tea", &[], 3))
            .unwrap()
            .value;
        let _ = service.stop_timer(&handle, clock.now()).unwrap();
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn invalid_transitions_are_state_errors() {
        let (mut service, clock) = service();
        let handle = service
            .start_timer(request("Focus", &[], 5))
            .unwrap()
            .value;

        assert!(matches!(
            service.acknowledge(&handle),
            Err(TimerError::State(StateError::InvalidTransition { .. }))
        ));
        let _ = service.stop_timer(&handle, clock.now()).unwrap();
        assert!(matches!(
            service.stop_timer(&handle, clock.now()),
            Err(TimerError::State(StateError::StaleHandle(_)))
        ));
        assert_eq!(kinds(service.log()), [EventKind::Start, EventKind::Stop]);
    }

    #[test]
    fn failed_write_keeps_timer_running_and_retries_in_order() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 5, 14, 0, 0).unwrap());
        let mut log = MemoryLog::new();
        log.fail_next_appends(1);
        let mut service = TimerService::open(log, clock.clone()).unwrap();

        let outcome = service
            .start_timer(request("Focus", &["deep"], 5))
            .unwrap();
        assert_eq!(outcome.write_error, Some(MemoryLogError::Unavailable));
        assert_eq!(service.pending_writes(), 1);
        assert!(service.log().events().is_empty());

        let handle = outcome.value;
        clock.advance(Duration::minutes(1));
        assert_eq!(
            service.poll_remaining(&handle, clock.now()).unwrap(),
            Duration::minutes(4)
        );

        // Pending events still show up in history.
        assert_eq!(service.list_all_tags().unwrap(), ["deep"]);

        let outcome = service.stop_timer(&handle, clock.now()).unwrap();
        assert!(outcome.write_error.is_none());
        assert_eq!(service.pending_writes(), 0);
        assert_eq!(kinds(service.log()), [EventKind::Start, EventKind::Stop]);
    }

    #[test]
    fn refresh_keeps_local_state_while_writes_pending() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 5, 14, 0, 0).unwrap());
        let mut log = MemoryLog::new();
        log.fail_next_appends(2);
        let mut service = TimerService::open(log, clock).unwrap();

        let _ = service.start_timer(request("Focus", &[], 5)).unwrap();
        service.refresh().unwrap();
        assert!(matches!(service.timer().state(), TimerState::Running(_)));
        assert_eq!(service.pending_writes(), 1);

        service.refresh().unwrap();
        assert_eq!(service.pending_writes(), 0);
        assert!(matches!(service.timer().state(), TimerState::Running(_)));
    }

    #[test]
    fn rejected_event_is_dropped_and_later_writes_go_through() {
        let (mut service, clock) = service();
        let fired = Rc::new(RefCell::new(0));
        let count = Rc::clone(&fired);
        service.on_alarm(move |_| *count.borrow_mut() += 1);

        let handle = service
            .start_timer(request("Tea", &[], 3))
            .unwrap()
            .value;
        clock.advance(Duration::minutes(3));

        // Another writer finished the session first.
        service
            .log
            .append(&Event::finish(handle.session_id().clone(), clock.now(), 180.0))
            .unwrap();

        let outcome = service.finish_timer(&handle, clock.now()).unwrap();
        assert!(outcome.superseded);
        assert!(outcome.write_error.is_none());
        assert_eq!(*fired.borrow(), 0);
        assert_eq!(service.pending_writes(), 0);
        assert!(matches!(service.timer().state(), TimerState::Alarm(_)));

        let _ = service.acknowledge(&handle).unwrap();
        let next = service.start_timer(request("Focus", &[], 5)).unwrap();
        assert!(!next.superseded);
        assert!(next.write_error.is_none());
        assert_eq!(
            kinds(service.log()),
            [
                EventKind::Start,
                EventKind::Finish,
                EventKind::Acknowledge,
                EventKind::Start
            ]
        );
    }

    #[test]
    fn stop_losing_to_a_finish_leaves_the_alarm_up() {
        let (mut service, clock) = service();
        let handle = service
            .start_timer(request("Tea", &[], 3))
            .unwrap()
            .value;
        clock.advance(Duration::minutes(3));
        service
            .log
            .append(&Event::finish(handle.session_id().clone(), clock.now(), 180.0))
            .unwrap();

        let outcome = service.stop_timer(&handle, clock.now()).unwrap();
        assert!(outcome.superseded);
        assert!(matches!(service.timer().state(), TimerState::Alarm(_)));
        assert_eq!(
            service.list_past_sessions().unwrap()[0].status,
            SessionStatus::Completed
        );
    }

    #[test]
    fn open_resumes_session_from_log() {
        let (mut service, clock) = service();
        let handle = service
            .start_timer(request("Focus", &[], 5))
            .unwrap()
            .value;
        let log = service.into_log();

        let mut resumed = TimerService::open(log, clock.clone()).unwrap();
        assert_eq!(resumed.active().unwrap().handle(), handle);
        let _ = resumed.stop_timer(&handle, clock.now()).unwrap();
        assert_eq!(resumed.log().events().len(), 2);
    }

    #[test]
    fn list_all_tags_spans_sessions() {
        let (mut service, clock) = service();
        for tags in [&["work", "urgent"][..], &["work"][..]] {
            let handle = service
                .start_timer(request("Focus", tags, 5))
                .unwrap()
                .value;
            let _ = service.stop_timer(&handle, clock.now()).unwrap();
        }
        assert_eq!(service.list_all_tags().unwrap(), ["urgent", "work"]);
    }
}
