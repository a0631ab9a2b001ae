//! Model-based property tests for the synchronizer.
//!
//! Random event sequences are fed to the synchronizer while a small model
//! executes its actions and tracks which subscriptions are open. After every
//! step:
//! - At most one subscription is open, and it is the synchronizer's active one
//! - Every `Cancel` targets an open subscription
//! - Subscription IDs are never reused
//! - `Publish` only happens while the identity is the subscribed user
//! - Resolution attempts equal the number of `connected` statuses seen

use std::collections::BTreeSet;

use chansync_client::{
    ConnectionStatus, Identity, Role, SubscriptionId, SyncAction, SyncConfig, SyncEvent,
    Synchronizer, TransportError,
};
use chansync_core::{ChangeSet, ChannelRecord, ChannelType};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Status(ConnectionStatus),
    SetIdentity(Option<Identity>),
    /// Fetch for the active subscription, or for a stale one when `stale`.
    Fetched { stale: bool },
    FetchFailed,
    Changed { stale: bool, channels: usize },
    StreamEnded,
    Teardown,
}

fn status_strategy() -> impl Strategy<Value = ConnectionStatus> {
    prop_oneof![
        3 => Just(ConnectionStatus::Connected),
        1 => Just(ConnectionStatus::Connecting),
        1 => Just(ConnectionStatus::Disconnecting),
        1 => Just(ConnectionStatus::Disconnected { reason: None }),
        1 => Just(ConnectionStatus::Unknown("flaky".to_string())),
    ]
}

fn identity_strategy() -> impl Strategy<Value = Option<Identity>> {
    prop_oneof![
        Just(None),
        Just(Some(Identity::new("anon", Role::Anonymous))),
        Just(Some(Identity::new("u1", Role::Member))),
        Just(Some(Identity::new("u2", Role::Admin))),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => status_strategy().prop_map(Op::Status),
        2 => identity_strategy().prop_map(Op::SetIdentity),
        3 => any::<bool>().prop_map(|stale| Op::Fetched { stale }),
        1 => Just(Op::FetchFailed),
        3 => (any::<bool>(), 0usize..4).prop_map(|(stale, channels)| Op::Changed { stale, channels }),
        1 => Just(Op::StreamEnded),
        1 => Just(Op::Teardown),
    ]
}

fn channels(n: usize) -> Vec<ChannelRecord> {
    (0..n).map(|i| ChannelRecord::new(ChannelType::default(), format!("c{i}"))).collect()
}

/// Tracks what the backend would see if the actions were executed.
#[derive(Default)]
struct Backend {
    open: BTreeSet<SubscriptionId>,
    ever_opened: BTreeSet<SubscriptionId>,
    opened_as: Option<Identity>,
    connected_seen: u64,
}

impl Backend {
    fn apply(&mut self, actions: &[SyncAction], identity: &Option<Identity>) -> Result<(), TestCaseError> {
        for action in actions {
            match action {
                SyncAction::Open { subscription, query } => {
                    prop_assert!(self.open.is_empty(), "open {subscription} while {:?} open", self.open);
                    prop_assert!(self.ever_opened.insert(*subscription), "reused {subscription}");
                    let user = identity.clone();
                    prop_assert!(user.as_ref().is_some_and(|u| !u.is_anonymous()));
                    prop_assert!(query.to_string().contains(&user.as_ref().map(|u| u.id.clone()).unwrap_or_default()));
                    self.open.insert(*subscription);
                    self.opened_as = user;
                },
                SyncAction::Cancel { subscription } => {
                    prop_assert!(self.open.remove(subscription), "cancel of unknown {subscription}");
                    self.opened_as = None;
                },
                SyncAction::Publish(_) => {
                    prop_assert_eq!(self.open.len(), 1);
                    prop_assert_eq!(identity, &self.opened_as);
                },
            }
        }
        Ok(())
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_single_subscription_under_any_interleaving(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let mut sync = Synchronizer::new(SyncConfig::default());
        let mut backend = Backend::default();
        let mut identity: Option<Identity> = Some(Identity::new("u1", Role::Member));
        let mut last_cancelled = SubscriptionId(0);

        for op in ops {
            let active = sync.active_subscription();
            let pick = |use_stale: bool| if use_stale { Some(last_cancelled) } else { active };

            let event = match op {
                Op::Status(status) => {
                    if status.is_connected() {
                        backend.connected_seen += 1;
                    }
                    Some(SyncEvent::Status(status))
                },
                Op::SetIdentity(next) => {
                    identity = next;
                    None
                },
                Op::Fetched { stale } => pick(stale)
                    .map(|subscription| SyncEvent::Fetched { subscription, channels: channels(2) }),
                Op::FetchFailed => active.map(|subscription| SyncEvent::FetchFailed {
                    subscription,
                    error: TransportError::Fetch("unavailable".to_string()),
                }),
                Op::Changed { stale, channels: n } => pick(stale).map(|subscription| SyncEvent::Changed {
                    subscription,
                    changes: ChangeSet::default(),
                    channels: channels(n),
                }),
                Op::StreamEnded => active.map(|subscription| SyncEvent::StreamEnded { subscription }),
                Op::Teardown => Some(SyncEvent::Teardown),
            };

            let Some(event) = event else { continue };
            let actions = sync.handle(event, &identity);
            backend.apply(&actions, &identity)?;

            for action in &actions {
                if let SyncAction::Cancel { subscription } = action {
                    last_cancelled = *subscription;
                }
            }

            prop_assert!(backend.open.len() <= 1);
            prop_assert_eq!(sync.active_subscription(), backend.open.iter().next().copied());
            prop_assert_eq!(sync.stats().resolution_attempts, backend.connected_seen);
        }
    }

    #[test]
    fn prop_anonymous_never_subscribes(statuses in proptest::collection::vec(status_strategy(), 0..30)) {
        let mut sync = Synchronizer::new(SyncConfig::default());
        let anonymous = Some(Identity::new("anon", Role::Anonymous));

        for status in statuses {
            let actions = sync.handle(SyncEvent::Status(status), &anonymous);
            prop_assert!(actions.is_empty());
        }
        prop_assert_eq!(sync.stats().subscriptions_opened, 0);
    }
}
