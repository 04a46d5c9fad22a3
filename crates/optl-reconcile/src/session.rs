use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::deadline::DeadlineGuard;
use crate::predicate::SuccessPredicate;
use crate::{SessionStatus, SessionView, Transition};

/// State of one payment-completion reconciliation.
///
/// The session is driven by three kinds of events: a successful read
/// ([`on_poll_result`](Self::on_poll_result)), a failed read
/// ([`on_poll_error`](Self::on_poll_error)) and the deadline firing
/// ([`on_deadline`](Self::on_deadline)). Every event is a no-op once the
/// session is terminal.
#[derive(Clone, Debug)]
pub struct ReconciliationSession<T> {
    baseline: Option<T>,
    current: Option<T>,
    started_at: DateTime<Utc>,
    status: SessionStatus,
    guard: DeadlineGuard,
    ticks: u32,
    failed_reads: u32,
    resolved_after: Option<Duration>,
}

impl<T: Clone> ReconciliationSession<T> {
    pub fn new(deadline: Duration, started_at: DateTime<Utc>) -> Self {
        Self {
            baseline: None,
            current: None,
            started_at,
            status: SessionStatus::Polling,
            guard: DeadlineGuard::new(deadline),
            ticks: 0,
            failed_reads: 0,
            resolved_after: None,
        }
    }

    /// Seed the baseline from state the client already knows.
    pub fn with_baseline(mut self, baseline: T) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn baseline(&self) -> Option<&T> {
        self.baseline.as_ref()
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn deadline(&self) -> Duration {
        self.guard.deadline()
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn failed_reads(&self) -> u32 {
        self.failed_reads
    }

    pub fn resolved_after(&self) -> Option<Duration> {
        self.resolved_after
    }

    /// Record the baseline once. Later captures are ignored.
    pub fn capture_baseline(&mut self, value: T) -> Transition {
        if self.is_terminal() {
            return Transition::IgnoredTerminal;
        }
        if self.baseline.is_some() {
            return Transition::Unchanged;
        }
        self.baseline = Some(value);
        Transition::BaselineCaptured
    }

    /// Apply one successful read taken `elapsed` after session start.
    ///
    /// If no baseline exists yet, `value` becomes the baseline before the
    /// predicate runs. A read at or past the deadline times the session out
    /// instead of being evaluated.
    pub fn on_poll_result<P>(&mut self, value: T, elapsed: Duration, predicate: &P) -> Transition
    where
        P: SuccessPredicate<T> + ?Sized,
    {
        if self.is_terminal() {
            return Transition::IgnoredTerminal;
        }
        if self.guard.is_expired(elapsed) {
            return self.resolve(SessionStatus::Timeout, elapsed);
        }

        self.ticks += 1;
        let captured = self.baseline.is_none();
        if captured {
            self.baseline = Some(value.clone());
        }

        let satisfied = predicate.is_satisfied(self.baseline.as_ref(), &value);
        self.current = Some(value);

        if satisfied {
            self.resolve(SessionStatus::Success, elapsed)
        } else if captured {
            Transition::BaselineCaptured
        } else {
            Transition::Unchanged
        }
    }

    /// A read failed. Counted, otherwise ignored.
    pub fn on_poll_error(&mut self) -> Transition {
        if self.is_terminal() {
            return Transition::IgnoredTerminal;
        }
        self.failed_reads += 1;
        Transition::Unchanged
    }

    /// The deadline timer fired.
    pub fn on_deadline(&mut self) -> Transition {
        if self.is_terminal() {
            return Transition::IgnoredTerminal;
        }
        let deadline = self.guard.deadline();
        self.resolve(SessionStatus::Timeout, deadline)
    }

    pub fn view(&self) -> SessionView<T> {
        SessionView {
            status: self.status,
            baseline: self.baseline.clone(),
            current: self.current.clone(),
            started_at: self.started_at,
            ticks: self.ticks,
            failed_reads: self.failed_reads,
            resolved_after_ms: self.resolved_after.map(|d| d.as_millis() as u64),
            actions: self.status.actions().to_vec(),
        }
    }

    fn resolve(&mut self, status: SessionStatus, elapsed: Duration) -> Transition {
        self.status = status;
        self.resolved_after = Some(elapsed);
        match status {
            SessionStatus::Success => Transition::Succeeded,
            SessionStatus::Timeout => Transition::TimedOut,
            SessionStatus::Polling => Transition::Unchanged,
        }
    }
}
