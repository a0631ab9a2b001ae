//! Session commands from the presentation layer.

/// Events fed into the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connect as the user behind `token`.
    Connect {
        /// Raw signed user token
        token: String,
    },

    /// Disconnect, keeping the credential.
    Disconnect,

    /// Reset to anonymous, disconnect, and drop the push registration.
    Logout,

    /// Register (`Some`) or remove (`None`) the push device token.
    SetPushToken(Option<Vec<u8>>),
}
