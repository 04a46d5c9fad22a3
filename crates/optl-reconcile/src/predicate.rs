//! Success predicates.
//!
//! A predicate decides whether the latest observed value counts as "the
//! payment has landed" relative to the baseline. The poller is generic over
//! this trait, so the subscription and credit variants share one machine.

use crate::account::SubscriptionStatus;

/// Decides whether `current` is an improvement over `baseline`.
///
/// `baseline` is `None` only if no read has succeeded yet and no value was
/// known up front. Closures of shape `Fn(Option<&T>, &T) -> bool` implement
/// this trait.
pub trait SuccessPredicate<T>: Send + Sync {
    fn is_satisfied(&self, baseline: Option<&T>, current: &T) -> bool;
}

impl<T, F> SuccessPredicate<T> for F
where
    F: Fn(Option<&T>, &T) -> bool + Send + Sync,
{
    fn is_satisfied(&self, baseline: Option<&T>, current: &T) -> bool {
        self(baseline, current)
    }
}

/// Subscription became active, optionally on a specific plan tier.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriptionActive {
    pub target_plan: Option<String>,
}

impl SubscriptionActive {
    pub fn check(&self, status: &SubscriptionStatus, plan: Option<&str>) -> bool {
        if !status.is_active() {
            return false;
        }
        match (&self.target_plan, plan) {
            (None, _) => true,
            (Some(want), Some(got)) => want.trim().eq_ignore_ascii_case(got.trim()),
            (Some(_), None) => false,
        }
    }
}

/// Credit balance strictly greater than the baseline.
///
/// Without a baseline nothing can be proven to have increased.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CreditsIncreased;

impl CreditsIncreased {
    pub fn check(&self, baseline: Option<i64>, current: i64) -> bool {
        match baseline {
            Some(b) => current > b,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_must_strictly_increase() {
        assert!(!CreditsIncreased.check(Some(100), 100));
        assert!(!CreditsIncreased.check(Some(100), 90));
        assert!(CreditsIncreased.check(Some(100), 150));
        assert!(!CreditsIncreased.check(None, 150));
    }

    #[test]
    fn inactive_subscription_never_satisfies() {
        let p = SubscriptionActive::default();
        assert!(!p.check(&SubscriptionStatus::Inactive, Some("pro")));
        assert!(p.check(&SubscriptionStatus::Active, None));
    }

    #[test]
    fn target_plan_requires_plan_present() {
        let p = SubscriptionActive {
            target_plan: Some("pro".to_string()),
        };
        assert!(!p.check(&SubscriptionStatus::Active, None));
    }

    #[test]
    fn closures_are_predicates() {
        let p = |b: Option<&u32>, c: &u32| b.map(|b| c > b).unwrap_or(false);
        assert!(p.is_satisfied(Some(&1), &2));
        assert!(!p.is_satisfied(None, &2));
    }
}
