//! Observable transport state for invariant checking.
//!
//! Snapshots are taken atomically under the transport's lock, so invariants
//! never see a half-applied operation.

use chansync_core::{ConnectionStatus, Credential, Identity};

/// Snapshot of the simulated backend.
#[derive(Debug, Clone, Default)]
pub struct TransportSnapshot {
    /// Credential last handed to the transport.
    pub credential: Credential,
    /// Identity the transport currently holds. `None` if not materialized.
    pub identity: Option<Identity>,
    /// Current connection status.
    pub status: ConnectionStatus,
    /// Subscriptions currently open, oldest first.
    pub open_subscriptions: Vec<SubscriptionSnapshot>,
    /// Most subscriptions ever open at once.
    pub peak_subscriptions: usize,
}

/// One open channel list subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSnapshot {
    /// Backend subscription ID.
    pub id: u64,
    /// Identity the transport held when the subscription was opened.
    pub owner: Option<Identity>,
}
