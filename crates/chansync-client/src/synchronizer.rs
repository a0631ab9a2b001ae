//! Channel list synchronizer.
//!
//! The `Synchronizer` owns the single live channel list subscription. It is a
//! pure state machine: the caller feeds [`SyncEvent`]s and executes the
//! returned [`SyncAction`]s.
//!
//! # State Machine
//!
//! ```text
//!            valid identity           fetch ok / change
//! ┌──────┐  ─────────────> ┌─────────────┐ ───────────> ┌──────────────┐
//! │ Idle │                 │ Subscribing │              │ Synchronized │
//! └──────┘                 └─────────────┘              └──────────────┘
//!    ↑                        │   ↺ fetch failed              │
//!    │ teardown               │                               │ identity lost
//!    │                        ↓ identity lost                 ↓
//!    │                     ┌─────────────┐ <──────────────────┘
//!    └──────────────────── │ Invalidated │
//!                          └─────────────┘
//! ```
//!
//! A new valid identity from any state cancels the current subscription
//! before opening the next one, so at most one subscription is ever live.

use chansync_core::{ChannelQuery, ChannelType, Identity, Sort, SyncError, project};

use crate::{
    event::{SubscriptionId, SyncAction, SyncEvent},
    monitor::ConnectivityMonitor,
    resolver::{IdentityResolver, IdentitySource, Resolution},
};

/// Synchronizer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Channel type namespace queried
    pub channel_type: ChannelType,
    /// Channels per page
    pub page_size: usize,
    /// Sort criteria
    pub sort: Vec<Sort>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_type: ChannelType::default(),
            page_size: chansync_core::query::DEFAULT_PAGE_SIZE,
            sort: vec![Sort::default()],
        }
    }
}

impl SyncConfig {
    /// Build the channel query for `identity`.
    pub fn query_for(&self, identity: &Identity) -> ChannelQuery {
        ChannelQuery::for_identity(identity, &self.channel_type)
            .with_sort(self.sort.clone())
            .with_page_size(self.page_size)
    }
}

/// Synchronizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No subscription
    Idle,
    /// Subscription open, no successful synchronization yet
    Subscribing(SubscriptionId),
    /// Subscription open and at least one list published
    Synchronized(SubscriptionId),
    /// Identity lost while subscribed; subscription released
    Invalidated,
}

impl SyncState {
    /// Live subscription, if any.
    pub fn subscription(self) -> Option<SubscriptionId> {
        match self {
            Self::Subscribing(id) | Self::Synchronized(id) => Some(id),
            Self::Idle | Self::Invalidated => None,
        }
    }
}

/// Counters for observability and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// `connected`-triggered identity resolutions
    pub resolution_attempts: u64,
    /// Subscriptions opened
    pub subscriptions_opened: u64,
    /// Subscriptions cancelled
    pub subscriptions_cancelled: u64,
    /// Channel lists published
    pub snapshots_published: u64,
    /// Initial fetches that failed
    pub fetch_failures: u64,
    /// Events dropped as stale or failing re-validation
    pub events_dropped: u64,
}

/// Channel list synchronizer.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    config: SyncConfig,
    monitor: ConnectivityMonitor,
    resolver: IdentityResolver,
    state: SyncState,
    /// Identity the live subscription was opened for.
    subscribed_as: Option<Identity>,
    next_subscription: u64,
    stats: SyncStats,
}

impl Synchronizer {
    /// Create an idle synchronizer.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            monitor: ConnectivityMonitor::new(),
            resolver: IdentityResolver::new(),
            state: SyncState::Idle,
            subscribed_as: None,
            next_subscription: 1,
            stats: SyncStats::default(),
        }
    }

    /// Current state.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Live subscription, if any.
    pub fn active_subscription(&self) -> Option<SubscriptionId> {
        self.state.subscription()
    }

    /// Identity the live subscription was opened for.
    pub fn subscribed_as(&self) -> Option<&Identity> {
        self.subscribed_as.as_ref()
    }

    /// Counters.
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Connectivity monitor stage.
    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Process an event and return actions.
    ///
    /// `identity` is consulted on every `connected` status and on every
    /// channel event.
    pub fn handle<S: IdentitySource + ?Sized>(
        &mut self,
        event: SyncEvent,
        identity: &S,
    ) -> Vec<SyncAction> {
        match event {
            SyncEvent::Status(status) => {
                let Some(connected) = self.monitor.observe(status) else {
                    return Vec::new();
                };
                self.stats.resolution_attempts += 1;
                match self.resolver.resolve(connected, identity) {
                    Resolution::Valid(user) => self.subscribe(user),
                    Resolution::Anonymous(_) => self.invalidate(),
                    Resolution::Absent => Vec::new(),
                }
            },
            SyncEvent::Fetched { subscription, channels } => {
                if !self.accepts(subscription) {
                    return Vec::new();
                }
                self.publish(subscription, &channels, identity)
            },
            SyncEvent::FetchFailed { subscription, error } => {
                if !self.accepts(subscription) {
                    return Vec::new();
                }
                self.stats.fetch_failures += 1;
                let error = SyncError::ChannelFetch(error);
                tracing::warn!(%subscription, %error, recoverable = error.is_recoverable(), "initial fetch failed, awaiting changes");
                Vec::new()
            },
            SyncEvent::Changed { subscription, changes, channels } => {
                if !self.accepts(subscription) {
                    return Vec::new();
                }
                tracing::debug!(%subscription, changes = changes.len(), "channel list changed");
                self.publish(subscription, &channels, identity)
            },
            SyncEvent::StreamEnded { subscription } => {
                if !self.accepts(subscription) {
                    return Vec::new();
                }
                let error = SyncError::Subscription("change stream ended".to_string());
                tracing::warn!(%subscription, %error, recoverable = error.is_recoverable(), "releasing subscription");
                let actions = self.cancel_active();
                self.state = SyncState::Idle;
                actions
            },
            SyncEvent::Teardown => {
                let actions = self.cancel_active();
                self.state = SyncState::Idle;
                self.monitor.reset();
                actions
            },
        }
    }

    /// Replace any live subscription with one for `user`.
    fn subscribe(&mut self, user: Identity) -> Vec<SyncAction> {
        let mut actions = self.cancel_active();

        let subscription = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;

        let query = self.config.query_for(&user);
        tracing::info!(%subscription, user = %user.id, %query, "opening channel list subscription");

        self.state = SyncState::Subscribing(subscription);
        self.subscribed_as = Some(user);
        self.stats.subscriptions_opened += 1;

        actions.push(SyncAction::Open { subscription, query });
        actions
    }

    /// Re-validate identity, then publish the full channel set.
    fn publish<S: IdentitySource + ?Sized>(
        &mut self,
        subscription: SubscriptionId,
        channels: &[chansync_core::ChannelRecord],
        identity: &S,
    ) -> Vec<SyncAction> {
        match self.resolver.revalidate(identity) {
            Resolution::Valid(user) if self.subscribed_as.as_ref() == Some(&user) => {
                self.state = SyncState::Synchronized(subscription);
                self.stats.snapshots_published += 1;
                vec![SyncAction::Publish(project(channels))]
            },
            Resolution::Valid(user) => {
                tracing::debug!(%subscription, user = %user.id, "identity changed under subscription");
                self.invalidate()
            },
            Resolution::Anonymous(_) | Resolution::Absent => self.invalidate(),
        }
    }

    /// Drop the current event and release the subscription, if any.
    fn invalidate(&mut self) -> Vec<SyncAction> {
        let actions = self.cancel_active();
        if !actions.is_empty() {
            self.stats.events_dropped += 1;
            self.state = SyncState::Invalidated;
        }
        actions
    }

    fn cancel_active(&mut self) -> Vec<SyncAction> {
        self.subscribed_as = None;
        match self.state.subscription() {
            Some(subscription) => {
                tracing::info!(%subscription, "cancelling channel list subscription");
                self.stats.subscriptions_cancelled += 1;
                self.state = SyncState::Idle;
                vec![SyncAction::Cancel { subscription }]
            },
            None => Vec::new(),
        }
    }

    /// Whether events from `subscription` are still relevant.
    fn accepts(&mut self, subscription: SubscriptionId) -> bool {
        if self.state.subscription() == Some(subscription) {
            return true;
        }
        tracing::debug!(%subscription, "dropping event from inactive subscription");
        self.stats.events_dropped += 1;
        false
    }
}
