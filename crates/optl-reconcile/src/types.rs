use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default spacing between account-state reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_500);

/// Default maximum wait before a session gives up.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Shortest poll interval a session will run with.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Longest deadline a session will run with.
pub const MAX_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifecycle status of a reconciliation session.
///
/// `Polling` is the only non-terminal state. Once `Success` or `Timeout` is
/// reached the session never changes status again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Polling,
    Success,
    Timeout,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Polling)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Polling => "polling",
            SessionStatus::Success => "success",
            SessionStatus::Timeout => "timeout",
        }
    }

    /// User-facing actions available in this status.
    ///
    /// The view renders a spinner while polling, so nothing is offered then.
    /// `Refresh` is only offered after a timeout.
    pub fn actions(&self) -> &'static [ViewAction] {
        match self {
            SessionStatus::Polling => &[],
            SessionStatus::Success => &[ViewAction::GoToDashboard],
            SessionStatus::Timeout => &[ViewAction::GoToDashboard, ViewAction::Refresh],
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Navigation affordances exposed to the view layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewAction {
    GoToDashboard,
    Refresh,
}

impl ViewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewAction::GoToDashboard => "go_to_dashboard",
            ViewAction::Refresh => "refresh",
        }
    }
}

/// What a single session event did to the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Still polling; nothing observable changed beyond `current`.
    Unchanged,
    /// The baseline was recorded by this event.
    BaselineCaptured,
    /// Polling -> Success.
    Succeeded,
    /// Polling -> Timeout.
    TimedOut,
    /// The session was already terminal; the event was dropped.
    IgnoredTerminal,
}

impl Transition {
    /// `true` when this event moved the session into a terminal state.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Transition::Succeeded | Transition::TimedOut)
    }
}

/// Poll cadence and deadline for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileTiming {
    pub poll_interval: Duration,
    pub deadline: Duration,
}

impl Default for ReconcileTiming {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl ReconcileTiming {
    /// Timing the poller can schedule: the interval is at least
    /// [`MIN_POLL_INTERVAL`] and the deadline at most [`MAX_DEADLINE`].
    pub fn clamped(self) -> Self {
        Self {
            poll_interval: self.poll_interval.max(MIN_POLL_INTERVAL),
            deadline: self.deadline.min(MAX_DEADLINE),
        }
    }
}

/// Read-only projection of a session, published to observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionView<T> {
    pub status: SessionStatus,
    pub baseline: Option<T>,
    pub current: Option<T>,
    pub started_at: DateTime<Utc>,
    /// Successful reads evaluated against the predicate.
    pub ticks: u32,
    /// Reads that failed and were skipped.
    pub failed_reads: u32,
    /// Elapsed time at which the session became terminal.
    pub resolved_after_ms: Option<u64>,
    pub actions: Vec<ViewAction>,
}
