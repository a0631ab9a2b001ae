//! Simulation harness for channel synchronization testing.
//!
//! An in-memory implementation of the [`chansync_client::Transport`] trait
//! for deterministic testing of the session runtime, plus the tools tests
//! use to observe it.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks over [`SimTransport::snapshot`]. Use
//! [`InvariantRegistry::standard()`] for the subscription invariants.
//!
//! # Log Capture
//!
//! Absorbed errors are only observable in logs. [`LogCapture`] records them
//! so tests can assert on what was absorbed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod log_capture;
pub mod sim_transport;

pub use invariants::{
    Invariant, InvariantKind, InvariantRegistry, InvariantResult, LoggedOutHasNoSubscription,
    NoAnonymousSubscription, SingleSubscription, SubscriptionSnapshot, TransportSnapshot,
    Violation,
};
pub use log_capture::{CapturedEvent, LogCapture};
pub use sim_transport::{ANONYMOUS_USER_ID, SimSubscription, SimTransport, sim_token};
