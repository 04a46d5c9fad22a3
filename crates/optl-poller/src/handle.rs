use std::sync::atomic::{AtomicBool, Ordering};

use optl_reconcile::{SessionStatus, SessionView};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Owned handle to one running reconciliation.
///
/// The handle is the only owner of the session's timers. [`cancel`] stops
/// them; dropping the handle does the same, so a view that goes away can
/// never leave a timer mutating state behind it.
///
/// [`cancel`]: ReconcileHandle::cancel
pub struct ReconcileHandle<T> {
    rx: watch::Receiver<SessionView<T>>,
    task: JoinHandle<()>,
    cancelled: AtomicBool,
}

impl<T: Clone> ReconcileHandle<T> {
    pub(crate) fn new(rx: watch::Receiver<SessionView<T>>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.rx.borrow().status
    }

    /// Latest published view of the session.
    pub fn view(&self) -> SessionView<T> {
        self.rx.borrow().clone()
    }

    /// Receiver that is notified on every session update.
    ///
    /// The sender side closes when the session resolves or is cancelled.
    pub fn subscribe(&self) -> watch::Receiver<SessionView<T>> {
        self.rx.clone()
    }

    /// Wait until the session is terminal.
    ///
    /// If the session is cancelled first, returns the status it had at that
    /// moment (`Polling`).
    pub async fn wait_terminal(&self) -> SessionStatus {
        let mut rx = self.rx.clone();
        loop {
            let status = rx.borrow_and_update().status;
            if status.is_terminal() {
                return status;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().status;
            }
        }
    }

    /// Stop both timers and any read in flight. Safe to call repeatedly;
    /// only the first call has an effect.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.task.abort();
        debug!(status = %self.status(), "reconciliation cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `true` once the driver task has exited (resolved or cancelled).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Drop for ReconcileHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
