//! Presentation-facing session API.

use tokio::sync::{mpsc, oneshot};

use crate::{ChannelFeed, ChannelUpdates, SessionError, SessionEvent, runtime::Command};

/// Cloneable handle to a running session.
///
/// Lifecycle calls are fire-and-forget: they queue a command and return.
/// Failures surface only in logs and as the absence of channel updates.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    feed: ChannelFeed,
}

impl SessionHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, feed: ChannelFeed) -> Self {
        Self { commands, feed }
    }

    /// Connect as the user behind `token`.
    ///
    /// Any live subscription is released first. A malformed token aborts the
    /// attempt after that.
    pub fn connect(&self, token: impl Into<String>) {
        self.send(SessionEvent::Connect { token: token.into() });
    }

    /// Disconnect and release the live subscription. The credential is kept.
    pub fn disconnect(&self) {
        self.send(SessionEvent::Disconnect);
    }

    /// Reset to anonymous, disconnect, and remove the last push device.
    pub fn logout(&self) {
        self.send(SessionEvent::Logout);
    }

    /// Register (`Some`) or remove (`None`) the push device token.
    pub fn set_push_token(&self, token: Option<Vec<u8>>) {
        self.send(SessionEvent::SetPushToken(token));
    }

    /// Observe the channel list.
    ///
    /// The latest list, if any, is delivered first.
    pub fn channel_updates(&self) -> ChannelUpdates {
        self.feed.subscribe()
    }

    /// Wait until every command sent before this call has been processed,
    /// including queued push device requests.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the runtime has stopped.
    pub async fn barrier(&self) -> Result<(), SessionError> {
        let (done, wait) = oneshot::channel();
        self.commands.send(Command::Barrier(done)).map_err(|_| SessionError::Closed)?;
        wait.await.map_err(|_| SessionError::Closed)
    }

    fn send(&self, event: SessionEvent) {
        if self.commands.send(Command::Session(event)).is_err() {
            tracing::warn!("session runtime has stopped, command dropped");
        }
    }
}
