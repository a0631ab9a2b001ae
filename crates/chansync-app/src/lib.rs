//! Session layer for channel synchronization
//!
//! Session lifecycle state machine and the generic runtime that executes it
//! against a [`chansync_client::Transport`]. The same runtime code runs in
//! production and against the in-memory simulation.
//!
//! # Components
//!
//! - [`Session`]: lifecycle state machine (connect, disconnect, logout, push
//!   token)
//! - [`TokenStore`]: current credential
//! - [`Runtime`]: single serialized event loop owning the live subscription
//! - [`SessionHandle`]: fire-and-forget API for the presentation layer
//! - [`ChannelFeed`]: multicast channel list publisher with replay

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod config;
mod error;
mod event;
mod feed;
mod handle;
mod runtime;
mod session;
mod token;

pub use action::SessionAction;
pub use config::{DEFAULT_FEED_CAPACITY, SessionConfig};
pub use error::SessionError;
pub use event::SessionEvent;
pub use feed::{ChannelFeed, ChannelUpdates, Snapshot};
pub use handle::SessionHandle;
pub use runtime::Runtime;
pub use session::{Session, SessionPhase};
pub use token::TokenStore;
