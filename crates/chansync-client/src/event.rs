//! Synchronizer events and actions.

use std::fmt;

use chansync_core::{
    ChangeSet, ChannelQuery, ChannelRecord, ChannelViewModel, ConnectionStatus, TransportError,
};

/// Identifies one channel list subscription.
///
/// Allocated by the synchronizer in increasing order. Events from any
/// subscription other than the active one are stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Events the caller feeds into the synchronizer.
///
/// The caller is responsible for:
/// - Forwarding every status from the transport's status stream
/// - Completing the initial fetch of the subscription it opened
/// - Forwarding change sets, together with the subscription's current
///   channel set at the time of the change
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Transport reported a connection status.
    Status(ConnectionStatus),

    /// Initial fetch of a subscription completed.
    Fetched {
        /// Subscription the fetch belongs to
        subscription: SubscriptionId,
        /// Channel set after the fetch
        channels: Vec<ChannelRecord>,
    },

    /// Initial fetch of a subscription failed.
    FetchFailed {
        /// Subscription the fetch belongs to
        subscription: SubscriptionId,
        /// Transport failure
        error: TransportError,
    },

    /// Subscription delivered incremental changes.
    Changed {
        /// Subscription the changes belong to
        subscription: SubscriptionId,
        /// Changes as reported by the transport
        changes: ChangeSet,
        /// Channel set after the changes
        channels: Vec<ChannelRecord>,
    },

    /// Subscription's change stream ended.
    StreamEnded {
        /// Subscription whose stream ended
        subscription: SubscriptionId,
    },

    /// Disconnect or logout: release everything.
    Teardown,
}

/// Actions the synchronizer produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Open a channel list subscription, start its initial fetch, and
    /// forward its change stream tagged with `subscription`.
    Open {
        /// ID to tag all events of this subscription with
        subscription: SubscriptionId,
        /// Query to open the subscription with
        query: ChannelQuery,
    },

    /// Release a subscription and everything attached to it.
    ///
    /// Always emitted before the `Open` that replaces it.
    Cancel {
        /// Subscription to release
        subscription: SubscriptionId,
    },

    /// Replace the published channel list.
    Publish(Vec<ChannelViewModel>),
}
