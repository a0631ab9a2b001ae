//! Fuzz target for the session and synchronizer state machines
//!
//! Wires the two machines together the way the runtime does, with an
//! in-memory identity standing in for the backend.
//!
//! # Strategy
//!
//! - Lifecycle calls: connect (valid or malformed token), disconnect,
//!   logout, push token updates
//! - Transport noise: arbitrary status reports, fetch and change deliveries
//!
//! # Invariants
//!
//! - At most one subscription is open
//! - Logout leaves an anonymous credential and no open subscription
//! - A channel list is only published while a subscription is open
//! - Registered push tokens are the hex encoding of the supplied bytes

#![no_main]

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use chansync_app::{Session, SessionAction, SessionEvent};
use chansync_client::{SyncAction, SyncConfig, SyncEvent, Synchronizer};
use chansync_core::{
    ChangeSet, ChannelRecord, ChannelType, ConnectionStatus, Credential, Identity, Role,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    Connect { user: u8, malformed: bool },
    Disconnect,
    Logout,
    PushToken(Option<Vec<u8>>),
    Status(StatusChoice),
    Fetched { channels: u8 },
    Changed { channels: u8 },
    StreamEnded,
}

#[derive(Debug, Clone, Arbitrary)]
enum StatusChoice {
    Connected,
    Connecting,
    Disconnecting,
    Disconnected,
    Unknown,
}

impl StatusChoice {
    fn status(&self) -> ConnectionStatus {
        match self {
            Self::Connected => ConnectionStatus::Connected,
            Self::Connecting => ConnectionStatus::Connecting,
            Self::Disconnecting => ConnectionStatus::Disconnecting,
            Self::Disconnected => ConnectionStatus::Disconnected { reason: None },
            Self::Unknown => ConnectionStatus::Unknown("fuzz".to_string()),
        }
    }
}

fn token(user: u8) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    let claims = URL_SAFE_NO_PAD.encode(format!(r#"{{"user_id":"u{}"}}"#, user % 4));
    format!("h.{claims}.s")
}

fn channels(n: u8) -> Vec<ChannelRecord> {
    (0..n % 8).map(|i| ChannelRecord::new(ChannelType::default(), format!("c{i}"))).collect()
}

#[derive(Default)]
struct Backend {
    credential: Option<Credential>,
    identity: Option<Identity>,
    open: BTreeSet<u64>,
}

impl Backend {
    fn reload(&mut self) {
        self.identity = Some(match self.credential.as_ref().and_then(Credential::user_id) {
            Some(user) => Identity::new(user, Role::User),
            None => Identity::new("anonymous", Role::Anonymous),
        });
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut session = Session::new();
    let mut sync = Synchronizer::new(SyncConfig::default());
    let mut backend = Backend::default();

    for op in ops {
        let mut sync_events = Vec::new();
        let mut logout = false;

        let session_event = match op {
            Op::Connect { user, malformed } => Some(SessionEvent::Connect {
                token: if malformed { "not-a-token".to_string() } else { token(user) },
            }),
            Op::Disconnect => Some(SessionEvent::Disconnect),
            Op::Logout => {
                logout = true;
                Some(SessionEvent::Logout)
            },
            Op::PushToken(bytes) => Some(SessionEvent::SetPushToken(bytes)),
            Op::Status(choice) => {
                sync_events.push(SyncEvent::Status(choice.status()));
                None
            },
            Op::Fetched { channels: n } => {
                if let Some(subscription) = sync.active_subscription() {
                    sync_events.push(SyncEvent::Fetched { subscription, channels: channels(n) });
                }
                None
            },
            Op::Changed { channels: n } => {
                if let Some(subscription) = sync.active_subscription() {
                    sync_events.push(SyncEvent::Changed {
                        subscription,
                        changes: ChangeSet::default(),
                        channels: channels(n),
                    });
                }
                None
            },
            Op::StreamEnded => {
                if let Some(subscription) = sync.active_subscription() {
                    sync_events.push(SyncEvent::StreamEnded { subscription });
                }
                None
            },
        };

        if let Some(event) = session_event {
            let pushed = match &event {
                SessionEvent::SetPushToken(Some(bytes)) => Some(bytes.clone()),
                _ => None,
            };
            for action in session.handle(event) {
                match action {
                    SessionAction::CancelSubscriptions => sync_events.push(SyncEvent::Teardown),
                    SessionAction::SetCredential(credential) => {
                        backend.credential = Some(credential);
                        backend.identity = None;
                    },
                    SessionAction::ReloadIdentity => backend.reload(),
                    SessionAction::Connect => {
                        backend.reload();
                        sync_events.push(SyncEvent::Status(ConnectionStatus::Connected));
                    },
                    SessionAction::Disconnect => sync_events
                        .push(SyncEvent::Status(ConnectionStatus::Disconnected { reason: None })),
                    SessionAction::RegisterDevice { token } => {
                        let bytes = pushed.as_ref().expect("register only for a pushed token");
                        assert_eq!(token.len(), bytes.len() * 2);
                        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
                    },
                    SessionAction::WatchConnection | SessionAction::UnregisterLastDevice => {},
                }
            }
        }

        for event in sync_events {
            for action in sync.handle(event, &backend.identity) {
                match action {
                    SyncAction::Open { subscription, .. } => {
                        assert!(backend.open.is_empty(), "second subscription opened");
                        backend.open.insert(subscription.0);
                    },
                    SyncAction::Cancel { subscription } => {
                        assert!(backend.open.remove(&subscription.0), "cancel of unknown subscription");
                    },
                    SyncAction::Publish(_) => {
                        assert_eq!(backend.open.len(), 1, "publish without subscription");
                    },
                }
            }
        }

        assert!(backend.open.len() <= 1);
        if logout {
            assert!(session.credential().is_anonymous());
            assert!(backend.open.is_empty(), "subscription survived logout");
        }
    }
});
