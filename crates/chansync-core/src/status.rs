//! Connection status reported by the transport.
//!
//! The transport owns the status lifecycle; this crate only observes it.
//! Only [`ConnectionStatus::Connected`] drives synchronization forward.
//!
//! ```text
//! ┌─────────────┐  connect   ┌────────────┐           ┌───────────┐
//! │ Initialized │──────────>│ Connecting │─────────>│ Connected │
//! └─────────────┘           └────────────┘           └───────────┘
//!                                  ↑                        │ disconnect
//!                                  │                        ↓
//!                          ┌──────────────┐         ┌───────────────┐
//!                          │ Disconnected │<────────│ Disconnecting │
//!                          └──────────────┘         └───────────────┘
//! ```

use std::fmt;

/// Connection status as reported by the transport collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Transport created, never connected
    #[default]
    Initialized,
    /// Connection in progress
    Connecting,
    /// Connected with an established session
    Connected,
    /// Disconnect in progress
    Disconnecting,
    /// Not connected
    Disconnected {
        /// Reason reported by the transport, if any
        reason: Option<String>,
    },
    /// Status the transport reports that this crate does not model
    Unknown(String),
}

impl ConnectionStatus {
    /// True only for [`ConnectionStatus::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => f.write_str("initialized"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnecting => f.write_str("disconnecting"),
            Self::Disconnected { reason: None } => f.write_str("disconnected"),
            Self::Disconnected { reason: Some(reason) } => write!(f, "disconnected ({reason})"),
            Self::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}
