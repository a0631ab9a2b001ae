//! Chat backend abstraction.
//!
//! The [`Transport`] trait decouples the session runtime from a concrete chat
//! backend. Production code wraps a real SDK connection; tests use the
//! in-memory simulation from the harness crate. The same runtime code drives
//! both.

use std::future::Future;

use chansync_core::{
    ChannelListUpdate, ChannelQuery, ChannelRecord, ConnectionStatus, Credential, TransportError,
};
use futures::{future::BoxFuture, stream::BoxStream};

use crate::resolver::IdentitySource;

/// A live channel list subscription.
///
/// Dropping the handle releases the subscription on the backend. Futures and
/// streams obtained from it stop producing once it is dropped.
///
/// Every delivery carries the channel set it produced. Consumers that queue
/// deliveries must use that set and not [`ChannelListSubscription::channels`],
/// which may already include later changes.
pub trait ChannelListSubscription: Send + 'static {
    /// Start the initial fetch of the first page.
    ///
    /// Resolves to the channel set as of the open. Changes from
    /// [`ChannelListSubscription::changes`] apply on top of it.
    ///
    /// # Errors
    ///
    /// Resolves to [`TransportError::Fetch`] if the backend rejects the query.
    fn initial_fetch(&mut self) -> BoxFuture<'static, Result<Vec<ChannelRecord>, TransportError>>;

    /// Incremental updates, in the order the backend applied them.
    ///
    /// The stream ends when the subscription is released on either side.
    fn changes(&mut self) -> BoxStream<'static, ChannelListUpdate>;

    /// Channel set after the last update handed to the change stream.
    fn channels(&self) -> Vec<ChannelRecord>;
}

/// Chat backend operations used by the session runtime.
///
/// # Identity
///
/// Through [`IdentitySource`], every transport exposes the identity the
/// backend currently holds. It may lag behind [`Transport::set_credential`]
/// until [`Transport::reload_identity`] or [`Transport::connect`] completes.
///
/// # Implementations
///
/// - **Simulation**: `chansync_harness::SimTransport`, fully in memory
/// - **Production**: adapter over a chat SDK client
pub trait Transport: IdentitySource + Send + Sync + 'static {
    /// Channel list subscription handle.
    type Subscription: ChannelListSubscription;

    /// Connection status stream.
    ///
    /// The stream yields the current status first, then every change. Each
    /// call returns an independent stream.
    fn connection_status(&self) -> BoxStream<'static, ConnectionStatus>;

    /// Replace the credential used for subsequent operations.
    fn set_credential(&self, credential: Credential);

    /// Re-read the user identity for the current credential.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::IdentityReload`] if the backend rejects the
    /// credential.
    fn reload_identity(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Connect with the current credential.
    ///
    /// Completion is also reported through the status stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the connection cannot be
    /// established.
    fn connect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Disconnect. No-op if already disconnected.
    fn disconnect(&self);

    /// Open a channel list subscription for `query`.
    fn open_channel_list(&self, query: &ChannelQuery) -> Self::Subscription;

    /// Register a push device token for the current user.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Device`] if registration fails.
    fn register_device(&self, token: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Remove a previously registered push device.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Device`] if the device is unknown.
    fn unregister_device(&self, device_id: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// ID of the most recently registered device, if any.
    fn last_registered_device(&self) -> Option<String>;
}
