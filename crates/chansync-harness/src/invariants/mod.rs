//! Subscription invariants.
//!
//! Checks that run against a [`TransportSnapshot`] of the simulated backend
//! after any step of a test. They only look at what the backend can see:
//! the credential, the identity it resolved, and the subscriptions it holds.
//! That keeps them valid for any interleaving of lifecycle calls and
//! transport events.
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&sim.snapshot(), "after logout");
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{LoggedOutHasNoSubscription, NoAnonymousSubscription, SingleSubscription};
pub use snapshot::{SubscriptionSnapshot, TransportSnapshot};

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// Invariants known to the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// At most one channel list subscription is ever open
    SingleSubscription,
    /// No subscription is opened for an anonymous or absent identity
    NoAnonymousSubscription,
    /// An anonymous credential leaves no subscription open
    LoggedOutHasNoSubscription,
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SingleSubscription => "single_subscription",
            Self::NoAnonymousSubscription => "no_anonymous_subscription",
            Self::LoggedOutHasNoSubscription => "logged_out_has_no_subscription",
        };
        f.write_str(name)
    }
}

/// A failed check.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Which check failed
    pub invariant: InvariantKind,
    /// Offending state, rendered for the test output
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of the backend's subscription state.
pub trait Invariant: Send + Sync {
    /// Kind reported in violations.
    fn kind(&self) -> InvariantKind;

    /// `Err` with the offending subscription or counter when `state`
    /// breaks the property.
    fn check(&self, state: &TransportSnapshot) -> InvariantResult;
}

/// Set of invariants checked together.
#[derive(Default)]
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subscription invariant the harness knows.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SingleSubscription);
        registry.add(NoAnonymousSubscription);
        registry.add(LoggedOutHasNoSubscription);
        registry
    }

    /// Register `invariant`.
    pub fn add(&mut self, invariant: impl Invariant + 'static) {
        self.checks.push(Box::new(invariant));
    }

    /// Kinds of the registered checks, in registration order.
    pub fn kinds(&self) -> Vec<InvariantKind> {
        self.checks.iter().map(|check| check.kind()).collect()
    }

    /// Every violation in `snapshot`. Empty when all checks hold.
    pub fn violations(&self, snapshot: &TransportSnapshot) -> Vec<Violation> {
        self.checks.iter().filter_map(|check| check.check(snapshot).err()).collect()
    }

    /// Panic listing every violation in `snapshot`, labelled with `context`.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, snapshot: &TransportSnapshot, context: &str) {
        let violations = self.violations(snapshot);
        if !violations.is_empty() {
            let lines: Vec<String> = violations.iter().map(ToString::to_string).collect();
            panic!("{} invariant(s) violated {context}:\n  {}", lines.len(), lines.join("\n  "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chansync_core::{Credential, Identity, Role};

    #[test]
    fn standard_registry_covers_every_kind() {
        assert_eq!(
            InvariantRegistry::standard().kinds(),
            [
                InvariantKind::SingleSubscription,
                InvariantKind::NoAnonymousSubscription,
                InvariantKind::LoggedOutHasNoSubscription,
            ]
        );
    }

    #[test]
    fn idle_backend_has_no_violations() {
        assert!(InvariantRegistry::standard().violations(&TransportSnapshot::default()).is_empty());
    }

    #[test]
    fn anonymous_subscription_reports_both_checks() {
        let snapshot = TransportSnapshot {
            credential: Credential::Anonymous,
            identity: Some(Identity::new("anonymous", Role::Anonymous)),
            open_subscriptions: vec![SubscriptionSnapshot {
                id: 1,
                owner: Some(Identity::new("anonymous", Role::Anonymous)),
            }],
            peak_subscriptions: 1,
            ..TransportSnapshot::default()
        };

        let kinds: Vec<_> = InvariantRegistry::standard()
            .violations(&snapshot)
            .into_iter()
            .map(|v| v.invariant)
            .collect();
        assert_eq!(
            kinds,
            [InvariantKind::NoAnonymousSubscription, InvariantKind::LoggedOutHasNoSubscription]
        );
    }

    #[test]
    fn violation_names_its_kind() {
        let violation =
            Violation { invariant: InvariantKind::SingleSubscription, message: "2 open".into() };
        assert_eq!(violation.to_string(), "single_subscription: 2 open");
    }
}
