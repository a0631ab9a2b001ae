//! Error types for channel synchronization.
//!
//! Strongly-typed errors for each layer: credential parsing, the external
//! transport collaborator, and the synchronization taxonomy that the session
//! layer logs and absorbs.
//!
//! None of these cross the presentation boundary. They exist so that every
//! absorbed failure is logged with a precise cause.

use thiserror::Error;

/// Errors produced while parsing a user-supplied token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Token was empty or whitespace
    #[error("token is empty")]
    Empty,

    /// Token does not have the `header.payload.signature` shape
    #[error("malformed token: expected 3 segments, found {segments}")]
    Malformed {
        /// Number of non-empty dot-separated segments found
        segments: usize,
    },

    /// Payload segment is not valid unpadded base64url
    #[error("token payload is not base64url: {0}")]
    Encoding(String),

    /// Payload decoded but is not a JSON claims object
    #[error("token claims are not valid JSON: {0}")]
    Claims(String),

    /// Claims carry no usable `user_id`
    #[error("token has no user_id claim")]
    MissingUserId,
}

/// A role name that matches no [`Role`](crate::Role).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

/// Failures reported by the transport collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection attempt failed
    #[error("connect failed: {0}")]
    Connect(String),

    /// Reloading the current user failed
    #[error("identity reload failed: {0}")]
    IdentityReload(String),

    /// Channel list fetch failed
    #[error("channel fetch failed: {0}")]
    Fetch(String),

    /// Device registration or removal failed
    #[error("device registration failed: {0}")]
    Device(String),

    /// Transport has shut down
    #[error("transport closed")]
    Closed,
}

/// Synchronization error taxonomy.
///
/// Every variant is logged and absorbed where it occurs. The only observable
/// effect for the presentation layer is the absence of channel updates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// User token could not be turned into a credential
    #[error("credential rejected: {0}")]
    Credential(#[from] CredentialError),

    /// Identity reload did not complete
    #[error("identity reload failed: {0}")]
    IdentityReload(TransportError),

    /// Transport connect did not complete
    #[error("transport connect failed: {0}")]
    TransportConnect(TransportError),

    /// Initial channel fetch failed
    #[error("channel fetch failed: {0}")]
    ChannelFetch(TransportError),

    /// Channel list subscription misbehaved
    #[error("subscription error: {0}")]
    Subscription(String),
}

impl SyncError {
    /// Returns true if a later event on the same subscription can still
    /// recover without a reconnect.
    ///
    /// A failed initial fetch leaves the subscription open, so the next
    /// change event can still synchronize. Everything else is terminal for
    /// the current connect attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ChannelFetch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_are_recoverable() {
        assert!(SyncError::ChannelFetch(TransportError::Fetch("timeout".into())).is_recoverable());
    }

    #[test]
    fn connect_path_failures_are_terminal() {
        assert!(!SyncError::Credential(CredentialError::Empty).is_recoverable());
        assert!(
            !SyncError::IdentityReload(TransportError::IdentityReload("401".into()))
                .is_recoverable()
        );
        assert!(!SyncError::TransportConnect(TransportError::Closed).is_recoverable());
        assert!(!SyncError::Subscription("stream ended".into()).is_recoverable());
    }

    #[test]
    fn display_includes_cause() {
        let err = SyncError::from(CredentialError::Malformed { segments: 1 });
        assert_eq!(err.to_string(), "credential rejected: malformed token: expected 3 segments, found 1");
    }
}
