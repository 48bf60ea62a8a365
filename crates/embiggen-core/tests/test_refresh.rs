mod common;

use std::time::{Duration, Instant};

use common::ms;
use embiggen_core::consts::MAX_DEBOUNCE;
use embiggen_core::refresh::{Disposition, RefreshController, RefreshPhase, SessionId};

const SOURCE: &str = "uploads/sample.png";

fn controller() -> RefreshController {
    let mut c = RefreshController::new(SessionId(1), ms(400), true);
    c.set_source(Some(SOURCE.to_string()));
    c
}

// ---------------------------------------------------------------------------
// Debounce
// ---------------------------------------------------------------------------

#[test]
fn test_rapid_level_changes_coalesce_into_one_fetch() {
    let t0 = Instant::now();
    let mut c = controller();

    c.on_level_change(1, t0);
    assert!(c.poll(t0 + ms(49)).is_none());
    c.on_level_change(2, t0 + ms(50));
    assert!(c.poll(t0 + ms(99)).is_none());
    c.on_level_change(3, t0 + ms(100));

    assert!(c.poll(t0 + ms(499)).is_none());
    assert_eq!(c.phase(), RefreshPhase::Scheduled);

    let request = c.poll(t0 + ms(500)).expect("fetch due 400ms after last change");
    assert_eq!(request.level, 3);
    assert_eq!(request.source_path, SOURCE);
    assert_eq!(c.phase(), RefreshPhase::Fetching);

    // Nothing else is ever issued for that burst.
    assert!(c.poll(t0 + ms(5_000)).is_none());
}

#[test]
fn test_next_deadline_tracks_last_change() {
    let t0 = Instant::now();
    let mut c = controller();
    assert_eq!(c.next_deadline(), None);
    c.on_level_change(1, t0);
    assert_eq!(c.next_deadline(), Some(t0 + ms(400)));
    c.on_level_change(2, t0 + ms(100));
    assert_eq!(c.next_deadline(), Some(t0 + ms(500)));
}

#[test]
fn test_disabling_auto_refresh_cancels_pending_timer() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    c.set_auto_refresh(false, t0 + ms(100));

    assert_eq!(c.phase(), RefreshPhase::Idle);
    assert!(c.poll(t0 + ms(10_000)).is_none());
}

#[test]
fn test_level_changes_ignored_while_auto_refresh_off() {
    let t0 = Instant::now();
    let mut c = RefreshController::new(SessionId(1), ms(400), false);
    c.set_source(Some(SOURCE.to_string()));

    assert!(!c.on_level_change(4, t0));
    assert!(c.poll(t0 + ms(1_000)).is_none());
    assert_eq!(c.current_level(), Some(4));
}

#[test]
fn test_reenabling_auto_refresh_schedules_current_level() {
    let t0 = Instant::now();
    let mut c = RefreshController::new(SessionId(1), ms(400), false);
    c.set_source(Some(SOURCE.to_string()));
    c.on_level_change(5, t0);

    c.set_auto_refresh(true, t0 + ms(100));
    let request = c.poll(t0 + ms(500)).expect("refresh after re-enable");
    assert_eq!(request.level, 5);
}

#[test]
fn test_no_source_path_means_no_fetch() {
    let t0 = Instant::now();
    let mut c = RefreshController::new(SessionId(1), ms(400), true);
    assert!(!c.on_level_change(3, t0));
    assert!(c.poll(t0 + ms(1_000)).is_none());
}

#[test]
fn test_zero_debounce_fires_immediately() {
    let t0 = Instant::now();
    let mut c = RefreshController::new(SessionId(1), ms(0), true);
    c.set_source(Some(SOURCE.to_string()));
    c.on_level_change(1, t0);
    assert!(c.poll(t0).is_some());
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

#[test]
fn test_current_result_is_applied() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let request = c.poll(t0 + ms(400)).unwrap();

    let settled = c.complete(&request.ticket, Ok(vec![1, 2, 3]));
    assert_eq!(settled.disposition, Disposition::Apply(vec![1, 2, 3]));
    assert!(settled.follow_up.is_none());
    assert_eq!(c.phase(), RefreshPhase::Idle);
    assert!(!c.is_busy());
}

#[test]
fn test_failure_is_reported_and_not_retried() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let request = c.poll(t0 + ms(400)).unwrap();

    let settled = c.complete(&request.ticket, Err("connection refused".into()));
    assert_eq!(
        settled.disposition,
        Disposition::Failed("connection refused".into())
    );
    assert!(settled.follow_up.is_none());
    assert!(c.poll(t0 + ms(10_000)).is_none());

    // The next level change starts a fresh cycle.
    c.on_level_change(3, t0 + ms(10_000));
    assert_eq!(c.poll(t0 + ms(10_400)).unwrap().level, 3);
}

#[test]
fn test_unknown_ticket_is_stale() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let request = c.poll(t0 + ms(400)).unwrap();

    let mut other = request.ticket.clone();
    other.generation += 10;
    let settled = c.complete(&other, Ok(vec![9]));
    assert_eq!(settled.disposition, Disposition::Stale);
    assert!(c.is_busy(), "real in-flight request is still pending");

    let settled = c.complete(&request.ticket, Ok(vec![1]));
    assert_eq!(settled.disposition, Disposition::Apply(vec![1]));
}

#[test]
fn test_ticket_from_other_session_is_stale() {
    let t0 = Instant::now();
    let mut first = controller();
    first.on_level_change(2, t0);
    let old = first.poll(t0 + ms(400)).unwrap();

    let mut second = RefreshController::new(SessionId(2), ms(400), true);
    second.set_source(Some(SOURCE.to_string()));
    second.on_level_change(2, t0);
    second.poll(t0 + ms(400)).unwrap();

    assert_eq!(
        second.complete(&old.ticket, Ok(vec![7])).disposition,
        Disposition::Stale
    );
}

#[test]
fn test_level_change_during_flight_defers_next_request() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let first = c.poll(t0 + ms(400)).unwrap();

    c.on_level_change(4, t0 + ms(450));
    // Timer expires while the first fetch is still running: no second fetch.
    assert!(c.poll(t0 + ms(850)).is_none());
    assert_eq!(c.phase(), RefreshPhase::Fetching);

    let settled = c.complete(&first.ticket, Ok(vec![2]));
    assert_eq!(settled.disposition, Disposition::Discarded);
    let follow_up = settled.follow_up.expect("deferred request issued on settle");
    assert_eq!(follow_up.level, 4);
    assert_ne!(follow_up.ticket, first.ticket);

    let settled = c.complete(&follow_up.ticket, Ok(vec![4]));
    assert_eq!(settled.disposition, Disposition::Apply(vec![4]));
}

#[test]
fn test_result_for_outdated_level_is_discarded_while_timer_pending() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let first = c.poll(t0 + ms(400)).unwrap();

    c.on_level_change(3, t0 + ms(450));
    let settled = c.complete(&first.ticket, Ok(vec![2]));
    assert_eq!(settled.disposition, Disposition::Discarded);
    assert!(settled.follow_up.is_none());

    assert_eq!(c.poll(t0 + ms(850)).unwrap().level, 3);
}

#[test]
fn test_returning_to_in_flight_level_does_not_refetch() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let first = c.poll(t0 + ms(400)).unwrap();

    c.on_level_change(3, t0 + ms(450));
    c.on_level_change(2, t0 + ms(500));
    assert!(c.poll(t0 + ms(900)).is_none());

    let settled = c.complete(&first.ticket, Ok(vec![2]));
    assert_eq!(settled.disposition, Disposition::Apply(vec![2]));
    assert!(settled.follow_up.is_none());
}

#[test]
fn test_result_discarded_when_auto_refresh_disabled_mid_flight() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let request = c.poll(t0 + ms(400)).unwrap();

    c.set_auto_refresh(false, t0 + ms(450));
    assert_eq!(
        c.complete(&request.ticket, Ok(vec![1])).disposition,
        Disposition::Discarded
    );
}

#[test]
fn test_source_change_makes_in_flight_result_inapplicable() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let request = c.poll(t0 + ms(400)).unwrap();

    c.set_source(Some("uploads/other.png".to_string()));
    assert_eq!(
        c.complete(&request.ticket, Ok(vec![1])).disposition,
        Disposition::Discarded
    );
}

#[test]
fn test_cancel_all_turns_in_flight_completion_stale() {
    let t0 = Instant::now();
    let mut c = controller();
    c.on_level_change(2, t0);
    let request = c.poll(t0 + ms(400)).unwrap();
    c.on_level_change(3, t0 + ms(450));

    c.cancel_all();
    assert_eq!(c.phase(), RefreshPhase::Idle);
    assert_eq!(c.next_deadline(), None);
    assert_eq!(
        c.complete(&request.ticket, Ok(vec![1])).disposition,
        Disposition::Stale
    );
}

#[test]
fn test_phase_display() {
    assert_eq!(RefreshPhase::Idle.to_string(), "Idle");
    assert_eq!(RefreshPhase::Scheduled.to_string(), "Scheduled");
    assert_eq!(RefreshPhase::Fetching.to_string(), "Fetching");
}

#[test]
fn test_huge_debounce_is_clamped() {
    let t0 = Instant::now();
    let mut c = RefreshController::new(SessionId(1), Duration::MAX, true);
    c.set_source(Some(SOURCE.to_string()));

    assert!(c.on_level_change(2, t0));
    assert_eq!(c.next_deadline(), Some(t0 + MAX_DEBOUNCE));
    assert!(c.poll(t0 + MAX_DEBOUNCE).is_some());
}
