//! Session runtime.
//!
//! The runtime is the single serialized context of a session. It owns the
//! [`Session`] and [`Synchronizer`] state machines, executes their actions
//! against a [`Transport`], and feeds transport results back in as events.
//!
//! Everything that touches the live subscription happens on this task:
//! - Commands from [`SessionHandle`]s
//! - Connection statuses from the watched status stream
//! - Fetch results and change sets from the subscription forwarder
//!
//! Transport calls that suspend (connect, identity reload, device
//! registration) run on their own tasks and only log their outcome.

use std::sync::Arc;

use chansync_client::{
    ChannelListSubscription, SubscriptionId, SyncAction, SyncEvent, Synchronizer, Transport,
};
use chansync_core::{
    ChannelListUpdate, ChannelQuery, ChannelRecord, ConnectionStatus, SyncError, TransportError,
};
use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{ChannelFeed, Session, SessionAction, SessionConfig, SessionEvent, SessionHandle};

/// Requests from handles to the runtime.
#[derive(Debug)]
pub(crate) enum Command {
    /// Lifecycle operation
    Session(SessionEvent),
    /// Reply once everything queued before it has been processed
    Barrier(oneshot::Sender<()>),
}

/// Results from the subscription forwarder, tagged with their subscription.
///
/// Each result carries the channel set it produced, so queued signals never
/// observe later changes.
#[derive(Debug)]
enum Signal {
    Fetched(SubscriptionId, Vec<ChannelRecord>),
    FetchFailed(SubscriptionId, TransportError),
    Changed(SubscriptionId, ChannelListUpdate),
    Ended(SubscriptionId),
}

/// Push device operations, executed in order on one task.
#[derive(Debug)]
enum DeviceRequest {
    Register(String),
    UnregisterLast,
    Flush(oneshot::Sender<()>),
}

/// The live subscription and the task forwarding its events.
///
/// Dropping it releases the subscription and stops the forwarder.
struct ActiveSubscription<S> {
    id: SubscriptionId,
    _subscription: S,
    forwarder: JoinHandle<()>,
}

impl<S> Drop for ActiveSubscription<S> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Session runtime for transport `T`.
///
/// Created together with its [`SessionHandle`] by [`Runtime::new`]; drive it
/// with [`Runtime::run`]. The runtime stops once every handle is dropped.
pub struct Runtime<T: Transport> {
    transport: Arc<T>,
    session: Session,
    sync: Synchronizer,
    feed: ChannelFeed,
    commands: mpsc::UnboundedReceiver<Command>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    signals: mpsc::UnboundedReceiver<Signal>,
    device_tx: mpsc::UnboundedSender<DeviceRequest>,
    /// Taken by [`Runtime::run`] to start the device task.
    device_rx: Option<mpsc::UnboundedReceiver<DeviceRequest>>,
    /// Connection status watch. `None` until connect, and after teardown.
    status: Option<BoxStream<'static, ConnectionStatus>>,
    active: Option<ActiveSubscription<T::Subscription>>,
    /// In-flight connect attempts, aborted on disconnect.
    connecting: Vec<JoinHandle<()>>,
}

impl<T: Transport> Runtime<T> {
    /// Create a runtime and the handle that controls it.
    pub fn new(transport: Arc<T>, config: SessionConfig) -> (Self, SessionHandle) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let (device_tx, device_rx) = mpsc::unbounded_channel();
        let feed = ChannelFeed::new(config.feed_capacity);

        let runtime = Self {
            transport,
            session: Session::new(),
            sync: Synchronizer::new(config.sync),
            feed: feed.clone(),
            commands,
            signal_tx,
            signals,
            device_tx,
            device_rx: Some(device_rx),
            status: None,
            active: None,
            connecting: Vec::new(),
        };

        (runtime, SessionHandle::new(command_tx, feed))
    }

    /// Run the event loop until every [`SessionHandle`] is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run(mut self) {
        if let Some(requests) = self.device_rx.take() {
            tokio::spawn(run_devices(Arc::clone(&self.transport), requests));
        }
        tracing::debug!("session runtime started");

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(signal) = self.signals.recv() => self.handle_signal(signal),
                Some(status) = next_status(&mut self.status) => {
                    self.dispatch(SyncEvent::Status(status));
                },
            }
        }

        self.shutdown();
        tracing::debug!("session runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Session(event) => {
                for action in self.session.handle(event) {
                    self.execute(action);
                }
            },
            Command::Barrier(done) => {
                if self.device_tx.send(DeviceRequest::Flush(done)).is_err() {
                    tracing::debug!("device task gone, barrier dropped");
                }
            },
        }
    }

    fn execute(&mut self, action: SessionAction) {
        match action {
            SessionAction::CancelSubscriptions => {
                self.status = None;
                self.dispatch(SyncEvent::Teardown);
            },
            SessionAction::SetCredential(credential) => {
                self.transport.set_credential(credential);
            },
            SessionAction::ReloadIdentity => {
                let transport = Arc::clone(&self.transport);
                tokio::spawn(async move {
                    match transport.reload_identity().await {
                        Ok(()) => tracing::debug!("identity reloaded"),
                        Err(error) => {
                            let error = SyncError::IdentityReload(error);
                            tracing::warn!(%error, "identity reload absorbed");
                        },
                    }
                });
            },
            SessionAction::WatchConnection => {
                self.status = Some(self.transport.connection_status());
            },
            SessionAction::Connect => {
                self.connecting.retain(|task| !task.is_finished());
                let transport = Arc::clone(&self.transport);
                self.connecting.push(tokio::spawn(async move {
                    match transport.connect().await {
                        Ok(()) => tracing::debug!("transport connect completed"),
                        Err(error) => {
                            let error = SyncError::TransportConnect(error);
                            tracing::warn!(%error, "connect attempt absorbed");
                        },
                    }
                }));
            },
            SessionAction::Disconnect => {
                for task in self.connecting.drain(..) {
                    task.abort();
                }
                self.transport.disconnect();
            },
            SessionAction::RegisterDevice { token } => self.request_device(DeviceRequest::Register(token)),
            SessionAction::UnregisterLastDevice => self.request_device(DeviceRequest::UnregisterLast),
        }
    }

    fn request_device(&self, request: DeviceRequest) {
        if self.device_tx.send(request).is_err() {
            tracing::warn!("device task gone, push token change dropped");
        }
    }

    fn handle_signal(&mut self, signal: Signal) {
        let event = match signal {
            Signal::Fetched(subscription, channels) => SyncEvent::Fetched { subscription, channels },
            Signal::FetchFailed(subscription, error) => SyncEvent::FetchFailed { subscription, error },
            Signal::Changed(subscription, update) => SyncEvent::Changed {
                subscription,
                changes: update.changes,
                channels: update.channels,
            },
            Signal::Ended(subscription) => SyncEvent::StreamEnded { subscription },
        };
        self.dispatch(event);
    }

    fn dispatch(&mut self, event: SyncEvent) {
        for action in self.sync.handle(event, self.transport.as_ref()) {
            match action {
                SyncAction::Open { subscription, query } => self.open(subscription, &query),
                SyncAction::Cancel { subscription } => self.cancel(subscription),
                SyncAction::Publish(channels) => {
                    tracing::debug!(channels = channels.len(), "publishing channel list");
                    self.feed.publish(channels);
                },
            }
        }
    }

    fn open(&mut self, id: SubscriptionId, query: &ChannelQuery) {
        if let Some(previous) = self.active.take() {
            tracing::warn!(subscription = %previous.id, "replacing subscription that was not cancelled");
        }

        let mut subscription = self.transport.open_channel_list(query);
        let fetch = subscription.initial_fetch();
        let changes = subscription.changes();
        let forwarder = tokio::spawn(forward(id, fetch, changes, self.signal_tx.clone()));

        self.active = Some(ActiveSubscription { id, _subscription: subscription, forwarder });
    }

    fn cancel(&mut self, id: SubscriptionId) {
        match self.active.take() {
            Some(active) if active.id == id => drop(active),
            Some(active) => {
                tracing::warn!(subscription = %id, active = %active.id, "cancel for inactive subscription");
                self.active = Some(active);
            },
            None => tracing::debug!(subscription = %id, "cancel with no live subscription"),
        }
    }

    fn shutdown(&mut self) {
        self.status = None;
        self.dispatch(SyncEvent::Teardown);
        for task in self.connecting.drain(..) {
            task.abort();
        }
    }
}

/// Next status from the watch, or pending forever if there is none.
///
/// Clears the watch once its stream ends.
async fn next_status(
    watch: &mut Option<BoxStream<'static, ConnectionStatus>>,
) -> Option<ConnectionStatus> {
    let Some(stream) = watch.as_mut() else {
        return std::future::pending().await;
    };

    let status = stream.next().await;
    if status.is_none() {
        tracing::debug!("connection status stream ended");
        *watch = None;
    }
    status
}

/// Merge the initial fetch and the change stream into tagged signals.
///
/// The fetch result always comes first, then every update in arrival
/// order. Updates the backend applied before the fetch resolved wait in the
/// change stream until then.
async fn forward(
    subscription: SubscriptionId,
    fetch: BoxFuture<'static, Result<Vec<ChannelRecord>, TransportError>>,
    mut changes: BoxStream<'static, ChannelListUpdate>,
    signals: mpsc::UnboundedSender<Signal>,
) {
    let first = match fetch.await {
        Ok(channels) => Signal::Fetched(subscription, channels),
        Err(error) => Signal::FetchFailed(subscription, error),
    };
    if signals.send(first).is_err() {
        return;
    }

    while let Some(update) = changes.next().await {
        if signals.send(Signal::Changed(subscription, update)).is_err() {
            return;
        }
    }

    let _ = signals.send(Signal::Ended(subscription));
}

async fn run_devices<T: Transport>(
    transport: Arc<T>,
    mut requests: mpsc::UnboundedReceiver<DeviceRequest>,
) {
    while let Some(request) = requests.recv().await {
        match request {
            DeviceRequest::Register(token) => match transport.register_device(&token).await {
                Ok(()) => tracing::info!("push device registered"),
                Err(error) => tracing::warn!(%error, "push device registration absorbed"),
            },
            DeviceRequest::UnregisterLast => {
                let Some(device_id) = transport.last_registered_device() else {
                    tracing::debug!("no push device registered");
                    continue;
                };
                match transport.unregister_device(&device_id).await {
                    Ok(()) => tracing::info!(device = %device_id, "push device removed"),
                    Err(error) => tracing::warn!(%error, "push device removal absorbed"),
                }
            },
            DeviceRequest::Flush(done) => {
                let _ = done.send(());
            },
        }
    }
}
