//! Session lifecycle state machine.
//!
//! Pure state machine behind the presentation-facing operations. It consumes
//! [`SessionEvent`]s and produces the ordered [`SessionAction`]s that the
//! runtime executes. Ordering is the contract:
//!
//! | Event | Actions |
//! |---|---|
//! | `Connect` | cancel, set credential, reload, watch, connect |
//! | `Connect` (malformed token) | cancel |
//! | `Disconnect` | disconnect, cancel |
//! | `Logout` | set anonymous, reload, disconnect, cancel, unregister device |
//! | `SetPushToken(Some)` | register device |
//! | `SetPushToken(None)` | unregister device |
//!
//! Logout resets the credential before disconnecting so nothing can
//! reconnect with the old token.

use chansync_core::{Credential, SyncError};

use crate::{SessionAction, SessionEvent, token::TokenStore};

/// Lifecycle phase, as last requested by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// No lifecycle call yet.
    Idle,
    /// Connect requested.
    Active {
        /// User the credential belongs to
        user_id: String,
    },
    /// Disconnect requested; credential kept.
    Disconnected,
    /// Logout requested; credential reset to anonymous.
    LoggedOut,
}

/// Session lifecycle state machine.
#[derive(Debug, Clone)]
pub struct Session {
    tokens: TokenStore,
    phase: SessionPhase,
}

impl Session {
    /// Create an idle, anonymous session.
    pub fn new() -> Self {
        Self { tokens: TokenStore::new(), phase: SessionPhase::Idle }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::Connect { token } => self.connect(&token),
            SessionEvent::Disconnect => {
                self.phase = SessionPhase::Disconnected;
                vec![SessionAction::Disconnect, SessionAction::CancelSubscriptions]
            },
            SessionEvent::Logout => {
                let credential = self.tokens.reset().clone();
                self.phase = SessionPhase::LoggedOut;
                tracing::info!("logging out");
                vec![
                    SessionAction::SetCredential(credential),
                    SessionAction::ReloadIdentity,
                    SessionAction::Disconnect,
                    SessionAction::CancelSubscriptions,
                    SessionAction::UnregisterLastDevice,
                ]
            },
            SessionEvent::SetPushToken(Some(bytes)) if bytes.is_empty() => {
                tracing::warn!("ignoring empty push token");
                Vec::new()
            },
            SessionEvent::SetPushToken(Some(bytes)) => {
                vec![SessionAction::RegisterDevice { token: hex::encode(bytes) }]
            },
            SessionEvent::SetPushToken(None) => vec![SessionAction::UnregisterLastDevice],
        }
    }

    fn connect(&mut self, raw: &str) -> Vec<SessionAction> {
        let mut actions = vec![SessionAction::CancelSubscriptions];

        let credential = match self.tokens.install(raw) {
            Ok(credential) => credential.clone(),
            Err(error) => {
                let error = SyncError::from(error);
                tracing::warn!(%error, "connect aborted");
                return actions;
            },
        };

        if let Some(user_id) = credential.user_id() {
            tracing::info!(user = user_id, "connecting");
            self.phase = SessionPhase::Active { user_id: user_id.to_string() };
        }

        actions.extend([
            SessionAction::SetCredential(credential),
            SessionAction::ReloadIdentity,
            SessionAction::WatchConnection,
            SessionAction::Connect,
        ]);
        actions
    }

    /// Current credential.
    pub fn credential(&self) -> &Credential {
        self.tokens.credential()
    }

    /// Current phase.
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    use super::*;

    fn token(user_id: &str) -> String {
        let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"user_id":"{user_id}"}}"#));
        format!("eyJhbGciOiJIUzI1NiJ9.{claims}.devtoken")
    }

    #[test]
    fn connect_sequence() {
        let mut session = Session::new();
        let actions = session.handle(SessionEvent::Connect { token: token("u1") });

        assert!(matches!(actions.as_slice(), [
            SessionAction::CancelSubscriptions,
            SessionAction::SetCredential(Credential::Signed(_)),
            SessionAction::ReloadIdentity,
            SessionAction::WatchConnection,
            SessionAction::Connect,
        ]));
        assert_eq!(session.phase(), &SessionPhase::Active { user_id: "u1".into() });
    }

    #[test]
    fn malformed_token_only_cancels() {
        let mut session = Session::new();
        let actions = session.handle(SessionEvent::Connect { token: "garbage".into() });

        assert_eq!(actions, vec![SessionAction::CancelSubscriptions]);
        assert_eq!(session.phase(), &SessionPhase::Idle);
        assert!(session.credential().is_anonymous());
    }

    #[test]
    fn disconnect_keeps_credential() {
        let mut session = Session::new();
        let _ = session.handle(SessionEvent::Connect { token: token("u1") });
        let actions = session.handle(SessionEvent::Disconnect);

        assert_eq!(actions, vec![SessionAction::Disconnect, SessionAction::CancelSubscriptions]);
        assert_eq!(session.credential().user_id(), Some("u1"));
    }

    #[test]
    fn logout_resets_credential_before_disconnect() {
        let mut session = Session::new();
        let _ = session.handle(SessionEvent::Connect { token: token("u1") });
        let actions = session.handle(SessionEvent::Logout);

        assert_eq!(actions, vec![
            SessionAction::SetCredential(Credential::Anonymous),
            SessionAction::ReloadIdentity,
            SessionAction::Disconnect,
            SessionAction::CancelSubscriptions,
            SessionAction::UnregisterLastDevice,
        ]);
        assert!(session.credential().is_anonymous());
        assert_eq!(session.phase(), &SessionPhase::LoggedOut);
    }

    #[test]
    fn push_token_is_hex_encoded() {
        let mut session = Session::new();
        let actions = session.handle(SessionEvent::SetPushToken(Some(vec![0xde, 0xad, 0x01])));
        assert_eq!(actions, vec![SessionAction::RegisterDevice { token: "dead01".into() }]);

        let actions = session.handle(SessionEvent::SetPushToken(None));
        assert_eq!(actions, vec![SessionAction::UnregisterLastDevice]);

        assert!(session.handle(SessionEvent::SetPushToken(Some(Vec::new()))).is_empty());
    }
}
