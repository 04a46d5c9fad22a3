//! Scenario: teardown releases both timers.
//!
//! # Invariants under test
//!
//! 1. `cancel()` stops polling; no read is issued afterwards.
//! 2. `cancel()` is idempotent.
//! 3. The deadline never fires after cancellation: the status stays Polling.
//! 4. Dropping the handle has the same effect as `cancel()`.

use std::sync::Arc;
use std::time::Duration;

use optl_poller::{spawn_reconciliation, Baseline};
use optl_reconcile::{AccountSnapshot, ReconcileTiming, SessionStatus, SuccessCriterion};
use optl_testkit::ScriptedReader;

#[tokio::test(start_paused = true)]
async fn cancel_is_idempotent_and_stops_both_timers() {
    let reader = Arc::new(ScriptedReader::constant(AccountSnapshot::credits(100)));

    let handle = spawn_reconciliation(
        Arc::clone(&reader),
        SuccessCriterion::CreditsIncreased,
        Baseline::Known(AccountSnapshot::credits(100)),
        ReconcileTiming::default(),
    );

    tokio::time::sleep(Duration::from_millis(3_200)).await;
    assert!(reader.calls() >= 2);

    handle.cancel();
    handle.cancel();
    assert!(handle.is_cancelled());
    let calls_at_cancel = reader.calls();

    // Well past the deadline.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(reader.calls(), calls_at_cancel, "no reads after cancel");
    assert_eq!(handle.status(), SessionStatus::Polling, "deadline must not fire after cancel");
    assert_eq!(handle.wait_terminal().await, SessionStatus::Polling);
    assert!(handle.is_finished());

    handle.cancel();
    assert!(handle.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_polling() {
    let reader = Arc::new(ScriptedReader::constant(AccountSnapshot::credits(100)));

    let handle = spawn_reconciliation(
        Arc::clone(&reader),
        SuccessCriterion::CreditsIncreased,
        Baseline::Known(AccountSnapshot::credits(100)),
        ReconcileTiming::default(),
    );
    let mut updates = handle.subscribe();

    tokio::time::sleep(Duration::from_millis(1_600)).await;
    drop(handle);
    let calls_at_drop = reader.calls();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(reader.calls(), calls_at_drop);

    // The driver task is gone, so the update channel is closed.
    while updates.changed().await.is_ok() {}
    assert_eq!(updates.borrow().status, SessionStatus::Polling);
}

#[tokio::test(start_paused = true)]
async fn cancel_after_success_is_harmless() {
    let reader = Arc::new(ScriptedReader::constant(AccountSnapshot::credits(200)));

    let handle = spawn_reconciliation(
        Arc::clone(&reader),
        SuccessCriterion::CreditsIncreased,
        Baseline::Known(AccountSnapshot::credits(100)),
        ReconcileTiming::default(),
    );

    assert_eq!(handle.wait_terminal().await, SessionStatus::Success);
    handle.cancel();
    assert_eq!(handle.status(), SessionStatus::Success);
}
