//! Client
//!
//! Action-based channel list synchronizer. Turns the transport's connection
//! status stream into exactly one live channel list subscription for the
//! current user, and channel events into presentation snapshots.
//!
//! # Architecture
//!
//! The synchronizer is Sans-IO. It receives events ([`SyncEvent`]), processes
//! them through pure state machine logic, and returns actions ([`SyncAction`])
//! for the caller to execute against a [`Transport`].
//!
//! ```text
//! status ─> ConnectivityMonitor ─> IdentityResolver ─> ChannelQuery ─> Open
//!                                                                       │
//! Fetched / Changed ─> re-validate identity ─> project ─> Publish <─────┘
//! ```
//!
//! # Components
//!
//! - [`ConnectivityMonitor`]: filters statuses down to `connected`
//! - [`IdentityResolver`]: classifies the identity behind each connection
//! - [`Synchronizer`]: owns the single live subscription
//! - [`Transport`]: chat backend seam implemented by production and
//!   simulation backends

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod event;
mod monitor;
mod resolver;
mod synchronizer;
mod transport;

pub use chansync_core::{ConnectionStatus, Identity, Role, SyncError, TransportError};
pub use event::{SubscriptionId, SyncAction, SyncEvent};
pub use monitor::{Connected, ConnectivityMonitor};
pub use resolver::{IdentityResolver, IdentitySource, Resolution};
pub use synchronizer::{SyncConfig, SyncState, SyncStats, Synchronizer};
pub use transport::{ChannelListSubscription, Transport};
