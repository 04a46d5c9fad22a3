//! optl-poller
//!
//! Async driver for payment-completion reconciliation.
//!
//! One spawned task owns one [`ReconciliationSession`] and races two timers
//! over it: the poll interval (one account read per tick) and the deadline.
//! Whichever resolves the session first wins; both timers are dropped as
//! soon as the session is terminal. The caller gets a [`ReconcileHandle`]
//! that observes the session and tears it down.
//!
//! [`ReconciliationSession`]: optl_reconcile::ReconciliationSession

mod driver;
mod handle;

pub use handle::ReconcileHandle;

use optl_account::AccountStateReader;
use optl_reconcile::{ReconcileTiming, ReconciliationSession, SuccessPredicate};
use tokio::sync::watch;
use tracing::warn;

/// Where the comparison point for "did it change" comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline<T> {
    /// The client already knows the pre-payment value.
    Known(T),
    /// Read it once at start. If that read fails the first later
    /// successful tick supplies it instead.
    FetchFirst,
}

/// Start a reconciliation session on the current tokio runtime.
///
/// The first poll fires one `timing.poll_interval` after start; the
/// deadline fires `timing.deadline` after start. Timing outside the
/// schedulable range is clamped (see [`ReconcileTiming::clamped`]).
/// Dropping or cancelling the returned handle stops both.
pub fn spawn_reconciliation<R, P, T>(
    reader: R,
    predicate: P,
    baseline: Baseline<T>,
    timing: ReconcileTiming,
) -> ReconcileHandle<T>
where
    R: AccountStateReader<State = T> + 'static,
    P: SuccessPredicate<T> + 'static,
    T: Clone + std::fmt::Debug + Send + Sync + 'static,
{
    let clamped = timing.clamped();
    if clamped != timing {
        warn!(
            requested_interval_ms = timing.poll_interval.as_millis() as u64,
            requested_deadline_ms = timing.deadline.as_millis() as u64,
            interval_ms = clamped.poll_interval.as_millis() as u64,
            deadline_ms = clamped.deadline.as_millis() as u64,
            "reconcile timing out of range; clamped"
        );
    }
    let timing = clamped;

    let mut session = ReconciliationSession::new(timing.deadline, chrono::Utc::now());
    let fetch_first = match baseline {
        Baseline::Known(value) => {
            session = session.with_baseline(value);
            false
        }
        Baseline::FetchFirst => true,
    };

    let (tx, rx) = watch::channel(session.view());
    let task = tokio::spawn(driver::drive(
        reader,
        predicate,
        session,
        fetch_first,
        timing,
        tx,
    ));

    ReconcileHandle::new(rx, task)
}
