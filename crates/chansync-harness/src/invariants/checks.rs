//! Standard invariant checks.

use super::{Invariant, InvariantKind, InvariantResult, TransportSnapshot, Violation};

/// At most one channel list subscription is open, now or ever.
///
/// The peak is checked as well so a replacement that opened the new
/// subscription before releasing the old one is caught even after the fact.
pub struct SingleSubscription;

impl Invariant for SingleSubscription {
    fn kind(&self) -> InvariantKind {
        InvariantKind::SingleSubscription
    }

    fn check(&self, state: &TransportSnapshot) -> InvariantResult {
        let open = state.open_subscriptions.len();
        if open > 1 || state.peak_subscriptions > 1 {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("{open} open, peak {}", state.peak_subscriptions),
            });
        }
        Ok(())
    }
}

/// Every open subscription belongs to a real user.
pub struct NoAnonymousSubscription;

impl Invariant for NoAnonymousSubscription {
    fn kind(&self) -> InvariantKind {
        InvariantKind::NoAnonymousSubscription
    }

    fn check(&self, state: &TransportSnapshot) -> InvariantResult {
        for subscription in &state.open_subscriptions {
            let valid = subscription.owner.as_ref().is_some_and(|owner| !owner.is_anonymous());
            if !valid {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "subscription {} opened for {:?}",
                        subscription.id, subscription.owner
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Once the credential is anonymous, nothing stays subscribed.
pub struct LoggedOutHasNoSubscription;

impl Invariant for LoggedOutHasNoSubscription {
    fn kind(&self) -> InvariantKind {
        InvariantKind::LoggedOutHasNoSubscription
    }

    fn check(&self, state: &TransportSnapshot) -> InvariantResult {
        if state.credential.is_anonymous() && !state.open_subscriptions.is_empty() {
            return Err(Violation {
                invariant: self.kind(),
                message: format!(
                    "anonymous credential with {} open subscription(s)",
                    state.open_subscriptions.len()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chansync_core::{Credential, Identity, Role};

    use super::*;
    use crate::invariants::SubscriptionSnapshot;

    fn subscription(id: u64, owner: Option<Identity>) -> SubscriptionSnapshot {
        SubscriptionSnapshot { id, owner }
    }

    fn signed() -> Credential {
        Credential::signed(&crate::sim_token("u1")).unwrap_or_default()
    }

    #[test]
    fn single_subscription_checks_peak() {
        let state = TransportSnapshot { peak_subscriptions: 2, ..Default::default() };
        assert!(SingleSubscription.check(&state).is_err());

        let state = TransportSnapshot {
            open_subscriptions: vec![subscription(1, Some(Identity::new("u1", Role::Member)))],
            peak_subscriptions: 1,
            ..Default::default()
        };
        assert!(SingleSubscription.check(&state).is_ok());
    }

    #[test]
    fn anonymous_owner_is_a_violation() {
        let state = TransportSnapshot {
            credential: signed(),
            open_subscriptions: vec![subscription(1, Some(Identity::new("anon", Role::Anonymous)))],
            peak_subscriptions: 1,
            ..Default::default()
        };
        let violation = NoAnonymousSubscription.check(&state).err();
        assert_eq!(violation.map(|v| v.invariant), Some(InvariantKind::NoAnonymousSubscription));
    }

    #[test]
    fn absent_owner_is_a_violation() {
        let state = TransportSnapshot {
            credential: signed(),
            open_subscriptions: vec![subscription(1, None)],
            ..Default::default()
        };
        assert!(NoAnonymousSubscription.check(&state).is_err());
    }

    #[test]
    fn logged_out_with_subscription_is_a_violation() {
        let state = TransportSnapshot {
            credential: Credential::Anonymous,
            open_subscriptions: vec![subscription(1, Some(Identity::new("u1", Role::Member)))],
            ..Default::default()
        };
        assert!(LoggedOutHasNoSubscription.check(&state).is_err());
    }
}
