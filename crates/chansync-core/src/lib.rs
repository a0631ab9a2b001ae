//! Core types for channel synchronization.
//!
//! Domain types and pure functions shared by the synchronizer and the session
//! layer. Nothing in this crate performs I/O or logs.
//!
//! # Components
//!
//! - [`Credential`]: anonymous or signed user credential
//! - [`ConnectionStatus`]: transport connection lifecycle
//! - [`Identity`] and [`Role`]: the authenticated user
//! - [`ChannelQuery`]: membership-or-recommended channel filter
//! - [`ChannelRecord`] and [`ChannelViewModel`]: raw channel and its
//!   presentation snapshot
//! - [`SyncError`]: the error taxonomy absorbed by the session layer

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod channel;
pub mod credential;
pub mod error;
pub mod identity;
pub mod query;
pub mod status;

pub use channel::{
    ChangeSet, ChannelListUpdate, ChannelRecord, ChannelViewModel, ListChange, MessageRecord,
    Timestamp, project,
};
pub use credential::{Credential, SignedToken};
pub use error::{CredentialError, SyncError, TransportError, UnknownRole};
pub use identity::{Identity, Role};
pub use query::{ChannelQuery, ChannelType, Filter, Sort, SortKey};
pub use status::ConnectionStatus;
