//! Deadline guard.
//!
//! Bounds how long a session may stay in `Polling`, independent of how often
//! (or whether) reads complete.
//!
//! # Invariants
//!
//! - **Inclusive**: `elapsed == deadline` is expired. A read landing on the
//!   deadline instant loses to the deadline.
//! - **Pure, no clock**: the caller measures elapsed time.

use std::time::Duration;

/// Result of checking elapsed time against the deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeadlineCheck {
    /// Time remains before the deadline.
    Pending { remaining: Duration },
    /// The deadline has been reached; `overrun` is how far past it we are.
    Expired { overrun: Duration },
}

impl DeadlineCheck {
    pub fn is_expired(&self) -> bool {
        matches!(self, DeadlineCheck::Expired { .. })
    }
}

/// Fixed maximum wait for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeadlineGuard {
    deadline: Duration,
}

impl DeadlineGuard {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn check(&self, elapsed: Duration) -> DeadlineCheck {
        match self.deadline.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => DeadlineCheck::Pending { remaining },
            _ => DeadlineCheck::Expired {
                overrun: elapsed.saturating_sub(self.deadline),
            },
        }
    }

    pub fn is_expired(&self, elapsed: Duration) -> bool {
        self.check(elapsed).is_expired()
    }
}
