use std::time::Duration;

use optl_account::{AccountStateReader, ReadError};
use optl_reconcile::{
    ReconcileTiming, ReconciliationSession, SessionView, SuccessPredicate, Transition,
};
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Session event loop.
///
/// Runs until the session is terminal. Each `select!` is biased towards the
/// deadline, so a tick and a deadline ready at the same instant resolve to
/// Timeout. A read still in flight when the deadline fires is dropped with
/// the losing branch.
pub(crate) async fn drive<R, P, T>(
    reader: R,
    predicate: P,
    mut session: ReconciliationSession<T>,
    fetch_first: bool,
    timing: ReconcileTiming,
    tx: watch::Sender<SessionView<T>>,
) where
    R: AccountStateReader<State = T>,
    P: SuccessPredicate<T>,
    T: Clone + std::fmt::Debug + Send + Sync,
{
    let started = Instant::now();
    let deadline = tokio::time::sleep_until(started + timing.deadline);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval_at(started + timing.poll_interval, timing.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        source = reader.source_name(),
        interval_ms = timing.poll_interval.as_millis() as u64,
        deadline_ms = timing.deadline.as_millis() as u64,
        fetch_baseline = fetch_first,
        "reconciliation started"
    );

    if fetch_first {
        tokio::select! {
            biased;
            _ = &mut deadline => {
                finish_timeout(&mut session, &tx);
                return;
            }
            read = reader.read_state() => match read {
                Ok(value) => {
                    debug!(?value, "baseline captured");
                    session.capture_baseline(value);
                }
                Err(e) => {
                    warn!(error = %e, "baseline read failed; will take baseline from next successful tick");
                    session.on_poll_error();
                }
            },
        }
        tx.send_replace(session.view());
    }

    let mut tick: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = &mut deadline => {
                finish_timeout(&mut session, &tx);
                return;
            }
            (elapsed, read) = poll_once(&mut ticker, &reader, started) => {
                tick += 1;
                let transition = match read {
                    Ok(value) => {
                        debug!(tick, elapsed_ms = elapsed.as_millis() as u64, ?value, "poll tick");
                        session.on_poll_result(value, elapsed, &predicate)
                    }
                    Err(e) => {
                        warn!(tick, error = %e, "account state read failed; polling continues");
                        session.on_poll_error()
                    }
                };
                tx.send_replace(session.view());

                match transition {
                    Transition::Succeeded => {
                        info!(
                            tick,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "reconciliation succeeded"
                        );
                        return;
                    }
                    Transition::TimedOut => {
                        warn!(tick, "reconciliation timed out on late read");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn poll_once<R, T>(
    ticker: &mut Interval,
    reader: &R,
    started: Instant,
) -> (Duration, Result<T, ReadError>)
where
    R: AccountStateReader<State = T>,
{
    ticker.tick().await;
    let read = reader.read_state().await;
    (started.elapsed(), read)
}

fn finish_timeout<T: Clone>(
    session: &mut ReconciliationSession<T>,
    tx: &watch::Sender<SessionView<T>>,
) {
    if session.on_deadline().is_resolution() {
        warn!(
            deadline_ms = session.deadline().as_millis() as u64,
            ticks = session.ticks(),
            failed_reads = session.failed_reads(),
            "reconciliation timed out"
        );
    }
    tx.send_replace(session.view());
}
