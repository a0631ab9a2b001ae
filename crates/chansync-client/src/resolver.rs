//! Identity resolution.
//!
//! Channels are only meaningful for a real user. The resolver reads the
//! current identity from an [`IdentitySource`] and classifies it; callers only
//! proceed on [`Resolution::Valid`]. The same classification is re-applied on
//! every channel event so a subscription cannot outlive a logout.

use std::sync::Arc;

use chansync_core::Identity;

use crate::monitor::Connected;

/// Synchronous accessor for the currently authenticated identity.
pub trait IdentitySource {
    /// Current identity. `None` if not yet materialized.
    fn current_identity(&self) -> Option<Identity>;
}

impl IdentitySource for Option<Identity> {
    fn current_identity(&self) -> Option<Identity> {
        self.clone()
    }
}

impl<T: IdentitySource + ?Sized> IdentitySource for &T {
    fn current_identity(&self) -> Option<Identity> {
        (**self).current_identity()
    }
}

impl<T: IdentitySource + ?Sized> IdentitySource for Arc<T> {
    fn current_identity(&self) -> Option<Identity> {
        (**self).current_identity()
    }
}

/// Outcome of classifying the current identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Connected but identity not yet materialized.
    Absent,
    /// Connected under an anonymous credential.
    Anonymous(Identity),
    /// A real user.
    Valid(Identity),
}

impl Resolution {
    /// The identity, if valid.
    pub fn into_valid(self) -> Option<Identity> {
        match self {
            Self::Valid(identity) => Some(identity),
            Self::Absent | Self::Anonymous(_) => None,
        }
    }
}

/// Resolves the identity behind each `connected` signal.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    attempts: u64,
}

impl IdentityResolver {
    /// Create a resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the identity for one `connected` signal.
    pub fn resolve<S: IdentitySource + ?Sized>(
        &mut self,
        _signal: Connected,
        source: &S,
    ) -> Resolution {
        self.attempts += 1;
        classify(source.current_identity())
    }

    /// Re-check the identity for a channel event.
    pub fn revalidate<S: IdentitySource + ?Sized>(&self, source: &S) -> Resolution {
        classify(source.current_identity())
    }

    /// Number of `connected`-triggered resolutions.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }
}

fn classify(identity: Option<Identity>) -> Resolution {
    match identity {
        None => Resolution::Absent,
        Some(identity) if identity.is_anonymous() => {
            tracing::debug!(user = %identity.id, "anonymous identity, channels not meaningful");
            Resolution::Anonymous(identity)
        },
        Some(identity) => Resolution::Valid(identity),
    }
}
