//! Scenario: subscription never activates; the deadline resolves the session.
//!
//! # Invariants under test
//!
//! 1. With every read returning "inactive", the session reaches Timeout at
//!    exactly t=30s.
//! 2. The tick that coincides with the deadline instant loses to it: only
//!    19 reads are issued over the 20 ticks that fit in 30s.
//! 3. A read in flight when the deadline fires is dropped, even if it would
//!    have satisfied the predicate; Success is never reached afterwards.
//! 4. A read completing exactly at the deadline instant resolves to Timeout.

use std::sync::Arc;
use std::time::Duration;

use optl_poller::{spawn_reconciliation, Baseline};
use optl_reconcile::{
    AccountSnapshot, ReconcileTiming, SessionStatus, SubscriptionStatus, SuccessCriterion,
};
use optl_testkit::{ScriptedReader, Step};
use tokio::time::Instant;

fn inactive() -> AccountSnapshot {
    AccountSnapshot::subscription(SubscriptionStatus::Inactive, None)
}

fn active_pro() -> AccountSnapshot {
    AccountSnapshot::subscription(SubscriptionStatus::Active, Some("pro"))
}

fn criterion() -> SuccessCriterion {
    SuccessCriterion::SubscriptionActive {
        target_plan: Some("pro".to_string()),
    }
}

/// 18 inactive reads (ticks 1..=18), then `last` on tick 19 (t=28.5s).
fn script_with_tick_19(last: Step<AccountSnapshot>) -> ScriptedReader<AccountSnapshot> {
    let mut steps: Vec<Step<AccountSnapshot>> = (0..18).map(|_| Step::ok(inactive())).collect();
    steps.push(last);
    ScriptedReader::new(steps)
}

#[tokio::test(start_paused = true)]
async fn inactive_for_whole_window_times_out_at_deadline() {
    let reader = Arc::new(ScriptedReader::constant(inactive()));
    let t0 = Instant::now();

    let handle = spawn_reconciliation(
        Arc::clone(&reader),
        criterion(),
        Baseline::Known(inactive()),
        ReconcileTiming::default(),
    );

    assert_eq!(handle.wait_terminal().await, SessionStatus::Timeout);
    assert_eq!(t0.elapsed(), Duration::from_secs(30));

    let view = handle.view();
    assert_eq!(view.resolved_after_ms, Some(30_000));
    assert_eq!(view.ticks, 19);
    assert_eq!(reader.calls(), 19, "tick 20 lands on the deadline and loses");

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(handle.status(), SessionStatus::Timeout);
    assert_eq!(reader.calls(), 19);
}

#[tokio::test(start_paused = true)]
async fn late_satisfying_response_cannot_resurrect_timeout() {
    // Tick 19 starts at 28.5s and would answer "active" at 33.5s.
    let reader = Arc::new(script_with_tick_19(
        Step::ok(active_pro()).after(Duration::from_secs(5)),
    ));

    let handle = spawn_reconciliation(
        Arc::clone(&reader),
        criterion(),
        Baseline::Known(inactive()),
        ReconcileTiming::default(),
    );

    assert_eq!(handle.wait_terminal().await, SessionStatus::Timeout);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let view = handle.view();
    assert_eq!(view.status, SessionStatus::Timeout);
    assert_eq!(view.current, Some(inactive()));
    assert_eq!(view.resolved_after_ms, Some(30_000));
}

#[tokio::test(start_paused = true)]
async fn response_at_exact_deadline_instant_resolves_timeout() {
    // Tick 19 starts at 28.5s and answers "active" at exactly 30.0s.
    let reader = Arc::new(script_with_tick_19(
        Step::ok(active_pro()).after(Duration::from_millis(1_500)),
    ));

    let handle = spawn_reconciliation(
        Arc::clone(&reader),
        criterion(),
        Baseline::Known(inactive()),
        ReconcileTiming::default(),
    );

    assert_eq!(handle.wait_terminal().await, SessionStatus::Timeout);
    assert_eq!(handle.view().current, Some(inactive()));
}

#[tokio::test(start_paused = true)]
async fn activation_before_deadline_wins() {
    let reader = Arc::new(script_with_tick_19(Step::ok(active_pro())));

    let handle = spawn_reconciliation(
        Arc::clone(&reader),
        criterion(),
        Baseline::Known(inactive()),
        ReconcileTiming::default(),
    );

    assert_eq!(handle.wait_terminal().await, SessionStatus::Success);
    assert_eq!(handle.view().resolved_after_ms, Some(28_500));

    // The deadline passing later changes nothing.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.status(), SessionStatus::Success);
}
