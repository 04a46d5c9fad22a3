//! Account-state values as observed from the backend.
//!
//! Two deployment variants exist: one reports subscription status and plan
//! tier, the other reports an available credit balance. Both are modelled
//! as a single [`AccountSnapshot`] so one session type covers either.

use serde::{Deserialize, Serialize};

use crate::predicate::{CreditsIncreased, SubscriptionActive, SuccessPredicate};

/// Subscription lifecycle as reported by the billing backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Trialing,
    PastDue,
    Canceled,
    /// Any value this client does not know about. Never counts as active.
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

/// One read of account state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountSnapshot {
    Subscription {
        status: SubscriptionStatus,
        plan: Option<String>,
    },
    Credits {
        available_credits: i64,
    },
}

impl AccountSnapshot {
    pub fn subscription(status: SubscriptionStatus, plan: Option<&str>) -> Self {
        AccountSnapshot::Subscription {
            status,
            plan: plan.map(str::to_string),
        }
    }

    pub fn credits(available_credits: i64) -> Self {
        AccountSnapshot::Credits { available_credits }
    }

    pub fn available_credits(&self) -> Option<i64> {
        match self {
            AccountSnapshot::Credits { available_credits } => Some(*available_credits),
            AccountSnapshot::Subscription { .. } => None,
        }
    }
}

/// Serializable success predicate over [`AccountSnapshot`].
///
/// A snapshot of the wrong variant never satisfies a criterion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuccessCriterion {
    /// Subscription is active and, when given, on the target plan.
    SubscriptionActive {
        #[serde(default)]
        target_plan: Option<String>,
    },
    /// Credit balance strictly above the baseline.
    CreditsIncreased,
}

impl SuccessPredicate<AccountSnapshot> for SuccessCriterion {
    fn is_satisfied(&self, baseline: Option<&AccountSnapshot>, current: &AccountSnapshot) -> bool {
        match self {
            SuccessCriterion::SubscriptionActive { target_plan } => {
                let AccountSnapshot::Subscription { status, plan } = current else {
                    return false;
                };
                SubscriptionActive {
                    target_plan: target_plan.clone(),
                }
                .check(status, plan.as_deref())
            }
            SuccessCriterion::CreditsIncreased => {
                let Some(now) = current.available_credits() else {
                    return false;
                };
                let before = baseline.and_then(AccountSnapshot::available_credits);
                CreditsIncreased.check(before, now)
            }
        }
    }
}
