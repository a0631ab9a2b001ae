//! In-memory transport for deterministic testing.
//!
//! `SimTransport` implements the full [`Transport`] surface without any I/O:
//! a connection status machine, credential-derived identities, a channel
//! store served through [`ChannelQuery`] evaluation, change-set delivery to
//! open subscriptions, a push device registry, and failure injection.
//!
//! Every open subscription is accounted for, so tests can assert that at most
//! one is ever live and that none belongs to an anonymous user.

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::Arc,
    time::Duration,
};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chansync_client::{ChannelListSubscription, IdentitySource, Transport};
use chansync_core::{
    ChangeSet, ChannelListUpdate, ChannelQuery, ChannelRecord, ConnectionStatus, Credential,
    Identity, ListChange, Role, Timestamp, TransportError,
};
use futures::{
    FutureExt, StreamExt,
    channel::mpsc,
    future::BoxFuture,
    stream::{self, BoxStream},
};
use parking_lot::Mutex;

use crate::invariants::{SubscriptionSnapshot, TransportSnapshot};

/// ID of the identity the backend assigns to anonymous credentials.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// Build a development token for `user_id`.
///
/// The token has a valid shape and claims; its signature is a placeholder.
pub fn sim_token(user_id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"user_id":"{user_id}"}}"#));
    format!("{header}.{claims}.devtoken")
}

/// A stored channel with per-user membership.
#[derive(Debug, Clone)]
struct SimChannel {
    record: ChannelRecord,
    members: BTreeMap<String, Role>,
}

impl SimChannel {
    /// The record as `user` sees it.
    fn view_for(&self, user: Option<&Identity>) -> ChannelRecord {
        let mut record = self.record.clone();
        record.member_ids = self.members.keys().cloned().collect();
        record.member_count = u32::try_from(self.members.len()).unwrap_or(u32::MAX);
        record.membership_role = user.and_then(|u| self.members.get(&u.id).copied());
        record
    }
}

#[derive(Debug)]
struct SimSubscriptionState {
    query: ChannelQuery,
    owner: Option<Identity>,
    /// Result set as last reported to the subscriber.
    listing: Vec<ChannelRecord>,
    changes: mpsc::UnboundedSender<ChannelListUpdate>,
}

#[derive(Debug, Default)]
struct Failures {
    connect: Option<String>,
    reload: Option<String>,
    fetch: Option<String>,
}

#[derive(Debug)]
struct SimState {
    status: ConnectionStatus,
    watchers: Vec<mpsc::UnboundedSender<ConnectionStatus>>,
    credential: Credential,
    identity: Option<Identity>,
    roles: HashMap<String, Role>,
    channels: Vec<SimChannel>,
    subscriptions: BTreeMap<u64, SimSubscriptionState>,
    next_subscription: u64,
    subscriptions_opened: u64,
    peak_subscriptions: usize,
    failures: Failures,
    connect_delay: Option<Duration>,
    fetch_delay: Option<Duration>,
    connect_attempts: u64,
    devices: Vec<String>,
}

impl SimState {
    fn new() -> Self {
        Self {
            status: ConnectionStatus::Initialized,
            watchers: Vec::new(),
            credential: Credential::Anonymous,
            identity: None,
            roles: HashMap::new(),
            channels: Vec::new(),
            subscriptions: BTreeMap::new(),
            next_subscription: 1,
            subscriptions_opened: 0,
            peak_subscriptions: 0,
            failures: Failures::default(),
            connect_delay: None,
            fetch_delay: None,
            connect_attempts: 0,
            devices: Vec::new(),
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        tracing::trace!(%status, "sim status");
        self.status = status.clone();
        self.watchers.retain(|watcher| watcher.unbounded_send(status.clone()).is_ok());
    }

    fn identity_for_credential(&self) -> Identity {
        match &self.credential {
            Credential::Anonymous => Identity::new(ANONYMOUS_USER_ID, Role::Anonymous),
            Credential::Signed(token) => {
                let role = self.roles.get(token.user_id()).copied().unwrap_or(Role::Member);
                Identity::new(token.user_id(), role)
            },
        }
    }

    fn materialize_identity(&mut self) {
        self.identity = Some(self.identity_for_credential());
    }

    fn listing(&self, query: &ChannelQuery, owner: Option<&Identity>) -> Vec<ChannelRecord> {
        let views: Vec<ChannelRecord> = self.channels.iter().map(|c| c.view_for(owner)).collect();
        query.apply(&views)
    }

    /// Recompute every subscription's result set and deliver the differences.
    fn notify(&mut self) {
        let mut updates = Vec::new();
        for (id, subscription) in &self.subscriptions {
            let listing = self.listing(&subscription.query, subscription.owner.as_ref());
            let changes = diff(&subscription.listing, &listing);
            if !changes.is_empty() {
                updates.push((*id, listing, changes));
            }
        }

        for (id, listing, changes) in updates {
            if let Some(subscription) = self.subscriptions.get_mut(&id) {
                subscription.listing = listing.clone();
                let update = ChannelListUpdate { changes, channels: listing };
                if subscription.changes.unbounded_send(update).is_err() {
                    tracing::trace!(subscription = id, "change receiver gone");
                }
            }
        }
    }

    fn channel_mut(&mut self, id: &str) -> Option<&mut SimChannel> {
        self.channels.iter_mut().find(|c| c.record.id == id)
    }

    fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            credential: self.credential.clone(),
            identity: self.identity.clone(),
            status: self.status.clone(),
            open_subscriptions: self
                .subscriptions
                .iter()
                .map(|(id, s)| SubscriptionSnapshot { id: *id, owner: s.owner.clone() })
                .collect(),
            peak_subscriptions: self.peak_subscriptions,
        }
    }
}

/// Positional differences between two result sets.
fn diff(old: &[ChannelRecord], new: &[ChannelRecord]) -> ChangeSet {
    let position = |list: &[ChannelRecord], id: &str| list.iter().position(|r| r.id == id);
    let mut changes = Vec::new();

    for (index, record) in old.iter().enumerate() {
        if position(new, &record.id).is_none() {
            changes.push(ListChange::Remove { id: record.id.clone(), index });
        }
    }

    for (index, record) in new.iter().enumerate() {
        match position(old, &record.id) {
            None => changes.push(ListChange::Insert { id: record.id.clone(), index }),
            Some(from) if from != index => {
                changes.push(ListChange::Move { id: record.id.clone(), from, to: index });
            },
            Some(from) if old[from] != *record => {
                changes.push(ListChange::Update { id: record.id.clone(), index });
            },
            Some(_) => {},
        }
    }

    ChangeSet::new(changes)
}

/// In-memory chat backend.
///
/// Cloning shares the same backend.
#[derive(Debug, Clone)]
pub struct SimTransport {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTransport {
    /// Create a backend with no channels, not connected.
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(SimState::new())) }
    }

    /// Set the role assigned to `user_id` on connect or reload.
    pub fn set_user_role(&self, user_id: &str, role: Role) {
        self.state.lock().roles.insert(user_id.to_string(), role);
    }

    /// Add a channel with the given members and their channel roles.
    ///
    /// Replaces any channel with the same ID.
    pub fn add_channel(&self, record: ChannelRecord, members: &[(&str, Role)]) {
        let mut state = self.state.lock();
        let members = members.iter().map(|(id, role)| ((*id).to_string(), *role)).collect();
        let channel = SimChannel { record, members };
        match state.channel_mut(&channel.record.id) {
            Some(existing) => *existing = channel,
            None => state.channels.push(channel),
        }
        state.notify();
    }

    /// Remove a channel.
    pub fn remove_channel(&self, id: &str) {
        let mut state = self.state.lock();
        state.channels.retain(|c| c.record.id != id);
        state.notify();
    }

    /// Add `user_id` to a channel with `role`.
    pub fn add_member(&self, channel_id: &str, user_id: &str, role: Role) {
        let mut state = self.state.lock();
        if let Some(channel) = state.channel_mut(channel_id) {
            channel.members.insert(user_id.to_string(), role);
        }
        state.notify();
    }

    /// Post a message to a channel.
    pub fn post_message(&self, channel_id: &str, text: &str, at: Timestamp) {
        let mut state = self.state.lock();
        if let Some(channel) = state.channel_mut(channel_id) {
            channel.record = channel.record.clone().with_message(text, at);
            channel.record.unread_count = channel.record.unread_count.saturating_add(1);
        }
        state.notify();
    }

    /// Set a channel's recommended flag.
    pub fn set_recommended(&self, channel_id: &str, recommended: bool) {
        let mut state = self.state.lock();
        if let Some(channel) = state.channel_mut(channel_id) {
            channel.record.is_recommended = Some(recommended);
        }
        state.notify();
    }

    /// Drive the connection status directly, as a network change would.
    pub fn push_status(&self, status: ConnectionStatus) {
        let mut state = self.state.lock();
        if status.is_connected() && state.identity.is_none() {
            state.materialize_identity();
        }
        state.set_status(status);
    }

    /// Fail the next connect attempt with `reason`.
    pub fn fail_next_connect(&self, reason: &str) {
        self.state.lock().failures.connect = Some(reason.to_string());
    }

    /// Fail the next identity reload with `reason`.
    pub fn fail_next_reload(&self, reason: &str) {
        self.state.lock().failures.reload = Some(reason.to_string());
    }

    /// Fail the next initial fetch with `reason`.
    pub fn fail_next_fetch(&self, reason: &str) {
        self.state.lock().failures.fetch = Some(reason.to_string());
    }

    /// Suspend connect attempts for `delay` between `connecting` and
    /// `connected`.
    pub fn set_connect_delay(&self, delay: Option<Duration>) {
        self.state.lock().connect_delay = delay;
    }

    /// Hold initial fetches for `delay` before they resolve.
    ///
    /// Mutations made while a fetch is held arrive as updates after it.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.state.lock().fetch_delay = delay;
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.state.lock().status.clone()
    }

    /// Credential last handed over.
    pub fn credential(&self) -> Credential {
        self.state.lock().credential.clone()
    }

    /// Subscriptions currently open.
    pub fn open_subscriptions(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Most subscriptions ever open at once.
    pub fn peak_subscriptions(&self) -> usize {
        self.state.lock().peak_subscriptions
    }

    /// Subscriptions opened since creation.
    pub fn subscriptions_opened(&self) -> u64 {
        self.state.lock().subscriptions_opened
    }

    /// Connect attempts started since creation.
    pub fn connect_attempts(&self) -> u64 {
        self.state.lock().connect_attempts
    }

    /// Registered push devices, oldest first.
    pub fn devices(&self) -> Vec<String> {
        self.state.lock().devices.clone()
    }

    /// Observable state for invariant checks.
    pub fn snapshot(&self) -> TransportSnapshot {
        self.state.lock().snapshot()
    }
}

impl IdentitySource for SimTransport {
    fn current_identity(&self) -> Option<Identity> {
        self.state.lock().identity.clone()
    }
}

impl Transport for SimTransport {
    type Subscription = SimSubscription;

    fn connection_status(&self) -> BoxStream<'static, ConnectionStatus> {
        let (sender, receiver) = mpsc::unbounded();
        let mut state = self.state.lock();
        if sender.unbounded_send(state.status.clone()).is_ok() {
            state.watchers.push(sender);
        }
        receiver.boxed()
    }

    fn set_credential(&self, credential: Credential) {
        let mut state = self.state.lock();
        let same_user = match (&credential, &state.identity) {
            (Credential::Signed(token), Some(identity)) => identity.id == token.user_id(),
            (Credential::Anonymous, Some(identity)) => identity.is_anonymous(),
            (_, None) => false,
        };
        if !same_user {
            state.identity = None;
        }
        state.credential = credential;
    }

    fn reload_identity(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        let state = Arc::clone(&self.state);
        async move {
            let mut state = state.lock();
            if let Some(reason) = state.failures.reload.take() {
                return Err(TransportError::IdentityReload(reason));
            }
            state.materialize_identity();
            Ok(())
        }
    }

    fn connect(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        let state = Arc::clone(&self.state);
        async move {
            let delay = {
                let mut state = state.lock();
                state.connect_attempts += 1;
                state.set_status(ConnectionStatus::Connecting);
                state.connect_delay
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = state.lock();
            if let Some(reason) = state.failures.connect.take() {
                state.set_status(ConnectionStatus::Disconnected { reason: Some(reason.clone()) });
                return Err(TransportError::Connect(reason));
            }
            state.materialize_identity();
            state.set_status(ConnectionStatus::Connected);
            Ok(())
        }
    }

    fn disconnect(&self) {
        let mut state = self.state.lock();
        if matches!(state.status, ConnectionStatus::Connected | ConnectionStatus::Connecting) {
            state.set_status(ConnectionStatus::Disconnecting);
            state.set_status(ConnectionStatus::Disconnected { reason: None });
        }
    }

    fn open_channel_list(&self, query: &ChannelQuery) -> SimSubscription {
        let mut state = self.state.lock();
        let id = state.next_subscription;
        state.next_subscription += 1;

        let owner = state.identity.clone();
        let listing = state.listing(query, owner.as_ref());
        let (changes, receiver) = mpsc::unbounded();
        state.subscriptions.insert(id, SimSubscriptionState {
            query: query.clone(),
            owner,
            listing: listing.clone(),
            changes,
        });
        state.subscriptions_opened += 1;
        state.peak_subscriptions = state.peak_subscriptions.max(state.subscriptions.len());

        SimSubscription {
            id,
            state: Arc::clone(&self.state),
            opened_with: listing,
            changes: Some(receiver),
        }
    }

    fn register_device(&self, token: &str) -> impl Future<Output = Result<(), TransportError>> + Send {
        let state = Arc::clone(&self.state);
        let token = token.to_string();
        async move {
            let mut state = state.lock();
            if !state.identity.as_ref().is_some_and(|i| !i.is_anonymous()) {
                return Err(TransportError::Device("no user to register a device for".into()));
            }
            state.devices.retain(|d| *d != token);
            state.devices.push(token);
            Ok(())
        }
    }

    fn unregister_device(&self, device_id: &str) -> impl Future<Output = Result<(), TransportError>> + Send {
        let state = Arc::clone(&self.state);
        let device_id = device_id.to_string();
        async move {
            let mut state = state.lock();
            let before = state.devices.len();
            state.devices.retain(|d| *d != device_id);
            if state.devices.len() == before {
                return Err(TransportError::Device(format!("unknown device {device_id}")));
            }
            Ok(())
        }
    }

    fn last_registered_device(&self) -> Option<String> {
        self.state.lock().devices.last().cloned()
    }
}

/// Subscription handle served by [`SimTransport`].
///
/// Dropping it closes the subscription on the backend.
#[derive(Debug)]
pub struct SimSubscription {
    id: u64,
    state: Arc<Mutex<SimState>>,
    /// Result set at open, served by the initial fetch.
    opened_with: Vec<ChannelRecord>,
    changes: Option<mpsc::UnboundedReceiver<ChannelListUpdate>>,
}

impl ChannelListSubscription for SimSubscription {
    fn initial_fetch(&mut self) -> BoxFuture<'static, Result<Vec<ChannelRecord>, TransportError>> {
        let state = Arc::clone(&self.state);
        let id = self.id;
        let listing = self.opened_with.clone();
        async move {
            let delay = state.lock().fetch_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let mut state = state.lock();
            if let Some(reason) = state.failures.fetch.take() {
                return Err(TransportError::Fetch(reason));
            }
            if !state.subscriptions.contains_key(&id) {
                return Err(TransportError::Closed);
            }
            Ok(listing)
        }
        .boxed()
    }

    fn changes(&mut self) -> BoxStream<'static, ChannelListUpdate> {
        match self.changes.take() {
            Some(receiver) => receiver.boxed(),
            None => stream::empty().boxed(),
        }
    }

    fn channels(&self) -> Vec<ChannelRecord> {
        self.state.lock().subscriptions.get(&self.id).map(|s| s.listing.clone()).unwrap_or_default()
    }
}

impl Drop for SimSubscription {
    fn drop(&mut self) {
        if self.state.lock().subscriptions.remove(&self.id).is_some() {
            tracing::trace!(subscription = self.id, "sim subscription closed");
        }
    }
}
