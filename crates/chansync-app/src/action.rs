//! Session side-effects.
//!
//! This module defines the [`SessionAction`] enum, which represents
//! instructions produced by the [`crate::Session`] state machine for the
//! runtime to execute against the transport.

use chansync_core::Credential;

/// Actions produced by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Release the channel list subscription and stop watching connection
    /// status. Executed synchronously.
    CancelSubscriptions,

    /// Hand a credential to the transport.
    SetCredential(Credential),

    /// Ask the transport to re-read the user for the current credential.
    ReloadIdentity,

    /// Start watching connection status from the current status onward.
    WatchConnection,

    /// Ask the transport to connect.
    Connect,

    /// Abort in-flight connect attempts and disconnect the transport.
    Disconnect,

    /// Register a push device.
    RegisterDevice {
        /// Hex-encoded device token
        token: String,
    },

    /// Remove the most recently registered push device, if any.
    UnregisterLastDevice,
}
