//! Scenario: credit top-up detected on the second tick.
//!
//! Baseline credits = 100; tick 1 reads 100 (no change), tick 2 reads 150.
//! The session must resolve to Success on tick 2 and stay there.

use std::time::Duration;

use chrono::Utc;
use optl_reconcile::{
    AccountSnapshot, ReconcileTiming, ReconciliationSession, SessionStatus, SuccessCriterion,
    Transition,
};

#[test]
fn credit_increase_on_second_tick_resolves_success() {
    let timing = ReconcileTiming::default();
    let mut s = ReconciliationSession::new(timing.deadline, Utc::now())
        .with_baseline(AccountSnapshot::credits(100));

    let tick1 = s.on_poll_result(
        AccountSnapshot::credits(100),
        timing.poll_interval,
        &SuccessCriterion::CreditsIncreased,
    );
    assert_eq!(tick1, Transition::Unchanged);
    assert_eq!(s.status(), SessionStatus::Polling);

    let tick2 = s.on_poll_result(
        AccountSnapshot::credits(150),
        timing.poll_interval * 2,
        &SuccessCriterion::CreditsIncreased,
    );
    assert_eq!(tick2, Transition::Succeeded);
    assert_eq!(s.status(), SessionStatus::Success);
    assert_eq!(s.ticks(), 2);
    assert_eq!(s.resolved_after(), Some(Duration::from_millis(3_000)));

    let view = s.view();
    assert_eq!(view.baseline, Some(AccountSnapshot::credits(100)));
    assert_eq!(view.current, Some(AccountSnapshot::credits(150)));
}

#[test]
fn balance_decrease_is_not_success() {
    let mut s = ReconciliationSession::new(Duration::from_secs(30), Utc::now())
        .with_baseline(AccountSnapshot::credits(100));

    let t = s.on_poll_result(
        AccountSnapshot::credits(80),
        Duration::from_millis(1_500),
        &SuccessCriterion::CreditsIncreased,
    );
    assert_eq!(t, Transition::Unchanged);
    assert_eq!(s.status(), SessionStatus::Polling);
}

#[test]
fn generic_session_accepts_closure_predicate() {
    let mut s = ReconciliationSession::new(Duration::from_secs(30), Utc::now()).with_baseline(3u32);
    let grew = |b: Option<&u32>, c: &u32| b.is_some_and(|b| c > b);

    assert_eq!(
        s.on_poll_result(3, Duration::from_secs(1), &grew),
        Transition::Unchanged
    );
    assert_eq!(
        s.on_poll_result(4, Duration::from_secs(2), &grew),
        Transition::Succeeded
    );
}
