//! Stop command for ending a countdown early.

use std::io::Write;

use anyhow::Result;

use ct_core::{Clock, EventLog, TimerService};

use crate::commands::util::{active_handle, handle_timer_error, quoted, report_write_error};

pub fn run<W: Write, L: EventLog, C: Clock>(
    writer: &mut W,
    service: &mut TimerService<L, C>,
) -> Result<()> {
    let handle = match active_handle(service, "stop") {
        Ok(handle) => handle,
        Err(err) => return handle_timer_error(writer, err),
    };

    let now = service.clock().now();
    let outcome = match service.stop_timer(&handle, now) {
        Ok(outcome) => outcome,
        Err(err) => return handle_timer_error(writer, err),
    };

    if outcome.superseded {
        let title = service
            .list_past_sessions()?
            .into_iter()
            .find(|session| session.session_id == *handle.session_id())
            .map(|session| session.title)
            .unwrap_or_default();
        writeln!(writer, "{} had already ended in another process.", quoted(&title))?;
        return Ok(());
    }

    let stopped = service
        .list_past_sessions()?
        .into_iter()
        .find(|session| session.session_id == *handle.session_id());
    if let Some(session) = stopped {
        writeln!(
            writer,
            "Stopped {} after {}.",
            quoted(&session.title),
            session.actual_elapsed()
        )?;
    }
    report_write_error(writer, service, outcome.write_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use ct_core::{EventKind, SessionStatus, TimerState};
    use insta::assert_snapshot;

    use crate::commands::test_support::{request, service};

    #[test]
    fn stop_reports_elapsed_time() {
        let (mut service, clock) = service();
        let _ = service
            .start_timer(request("Write report", &["work"], 25))
            .unwrap();
        clock.advance(Duration::seconds(65));

        let mut output = Vec::new();
        run(&mut output, &mut service).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r#"Stopped "Write report" after 1m 5s."#);
        assert_eq!(service.timer().state(), &TimerState::Idle);
        let sessions = service.list_past_sessions().unwrap();
        assert_eq!(sessions[0].status, SessionStatus::Stopped);
    }

    #[test]
    fn stop_after_another_process_finished_the_session() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("ct.db");
        let (_, clock) = service();

        let mut here =
            TimerService::open(ct_db::Database::open(&db_path).unwrap(), clock.clone()).unwrap();
        let handle = here.start_timer(request("Tea", &[], 1)).unwrap().value;
        let mut elsewhere =
            TimerService::open(ct_db::Database::open(&db_path).unwrap(), clock.clone()).unwrap();
        clock.advance(Duration::minutes(1));
        let _ = elsewhere.finish_timer(&handle, clock.now()).unwrap();

        let mut output = Vec::new();
        run(&mut output, &mut here).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r#""Tea" had already ended in another process."#);
        assert!(matches!(here.timer().state(), TimerState::Alarm(_)));
        assert_eq!(
            here.list_past_sessions().unwrap()[0].status,
            SessionStatus::Completed
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    fn stop_while_idle_fails_in_debug_builds() {
        let (mut service, _clock) = service();
        let mut output = Vec::new();
        let err = run(&mut output, &mut service).unwrap_err();

        assert_eq!(err.to_string(), "cannot stop while the timer is idle");
        assert!(service.log().read_all().unwrap().is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    fn stop_during_alarm_is_rejected() {
        let (mut service, clock) = service();
        let handle = service.start_timer(request("Tea", &[], 1)).unwrap().value;
        clock.advance(Duration::minutes(1));
        let _ = service.finish_timer(&handle, clock.now()).unwrap();

        let mut output = Vec::new();
        let err = run(&mut output, &mut service).unwrap_err();

        assert_eq!(err.to_string(), "cannot stop while the timer is alarm");
        let kinds: Vec<_> = service
            .log()
            .read_all()
            .unwrap()
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, [EventKind::Start, EventKind::Finish]);
    }
}
