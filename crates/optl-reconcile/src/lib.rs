//! optl-reconcile
//!
//! Payment-completion reconciliation state machine.
//!
//! After a seller returns from an external checkout, the client waits until
//! the backend reflects the payment (subscription activated, credits topped
//! up). This crate holds the state that wait runs on:
//! - a session with a captured baseline and the last observed value
//! - a success predicate comparing the two
//! - a deadline guard that forces Timeout
//!
//! Deterministic, pure logic. No IO. No clock: callers pass elapsed time.

pub mod account;
pub mod deadline;
pub mod predicate;
mod session;
mod types;

pub use account::{AccountSnapshot, SubscriptionStatus, SuccessCriterion};
pub use deadline::{DeadlineCheck, DeadlineGuard};
pub use predicate::{CreditsIncreased, SubscriptionActive, SuccessPredicate};
pub use session::ReconciliationSession;
pub use types::*;
