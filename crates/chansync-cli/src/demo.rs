//! Scripted session.
//!
//! The script walks one user through the lifecycle an app goes through:
//!
//! 1. Connect and receive the initial channel list
//! 2. A message arrives in a channel
//! 3. The user joins a new channel
//! 4. A push token is registered
//! 5. The app goes to the background (disconnect) and comes back (connect)
//! 6. Logout
//!
//! Every published list is logged. The run fails if any expected list does
//! not arrive within [`STEP_TIMEOUT`].

use std::{sync::Arc, time::Duration};

use chansync_app::{ChannelUpdates, Runtime, SessionConfig, SessionError, SessionHandle, Snapshot};
use chansync_client::SyncConfig;
use chansync_core::{ChannelRecord, ChannelType, ChannelViewModel, Role, Timestamp};
use chansync_harness::{SimTransport, sim_token};
use thiserror::Error;
use tokio::{task::JoinError, time::timeout};

/// How long each step may take to produce its channel list.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Push token registered during the run.
const DEMO_PUSH_TOKEN: &[u8] = b"chansync-demo-device";

/// Demo parameters.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// User to log in as
    pub user: String,
    /// Role of the user, and of their channel memberships
    pub role: Role,
    /// Channel type namespace to synchronize
    pub channel_type: ChannelType,
    /// Number of channels to seed
    pub channels: usize,
}

/// Outcome of a demo run.
#[derive(Debug, Clone)]
pub struct DemoReport {
    /// Channel lists received
    pub snapshots: usize,
    /// Last channel list received before logout
    pub final_list: Vec<ChannelViewModel>,
    /// Most subscriptions the backend ever held at once
    pub peak_subscriptions: usize,
    /// Subscriptions still open after logout
    pub open_after_logout: usize,
    /// Push devices still registered after logout
    pub devices_after_logout: usize,
}

/// Demo failures.
#[derive(Error, Debug)]
pub enum DemoError {
    /// Anonymous users never receive a channel list.
    #[error("demo user must not be anonymous")]
    AnonymousUser,

    /// A step did not produce its channel list in time.
    #[error("no channel list after {step}")]
    Stalled {
        /// Step that stalled
        step: &'static str,
    },

    /// The session runtime is gone.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session runtime panicked.
    #[error("runtime task failed: {0}")]
    Runtime(#[from] JoinError),
}

/// Run the scripted session.
///
/// # Errors
///
/// - [`DemoError::AnonymousUser`] if `config.role` is anonymous
/// - [`DemoError::Stalled`] if an expected channel list never arrives
pub async fn run(config: DemoConfig) -> Result<DemoReport, DemoError> {
    if config.role.is_anonymous() {
        return Err(DemoError::AnonymousUser);
    }

    let sim = SimTransport::new();
    seed(&sim, &config);

    let session_config = SessionConfig {
        sync: SyncConfig { channel_type: config.channel_type.clone(), ..SyncConfig::default() },
        ..SessionConfig::default()
    };
    let (runtime, session) = Runtime::new(Arc::new(sim.clone()), session_config);
    let runtime = tokio::spawn(runtime.run());

    let updates = session.channel_updates();
    let mut script = Script { session, updates, snapshots: 0, last: None };

    tracing::info!(user = %config.user, role = %config.role, "connecting");
    script.session.connect(sim_token(&config.user));
    script.next_list("connect").await?;

    let first = channel_id(&config.channel_type, 0);
    sim.post_message(&first, "anyone around?", Timestamp(100));
    script.next_list("incoming message").await?;

    let joined = format!("{}:announcements", config.channel_type);
    sim.add_channel(
        ChannelRecord::new(config.channel_type.clone(), joined).with_name("Announcements"),
        &[(config.user.as_str(), config.role)],
    );
    script.next_list("join").await?;

    script.session.set_push_token(Some(DEMO_PUSH_TOKEN.to_vec()));
    script.session.barrier().await?;
    tracing::info!(devices = sim.devices().len(), "push token registered");

    tracing::info!("backgrounded");
    script.session.disconnect();
    script.session.barrier().await?;
    tracing::info!(open_subscriptions = sim.open_subscriptions(), "disconnected");

    tracing::info!("foregrounded");
    script.session.connect(sim_token(&config.user));
    script.next_list("reconnect").await?;

    script.session.logout();
    script.session.barrier().await?;

    let report = DemoReport {
        snapshots: script.snapshots,
        final_list: script.last.take().map(|s| s.as_ref().clone()).unwrap_or_default(),
        peak_subscriptions: sim.peak_subscriptions(),
        open_after_logout: sim.open_subscriptions(),
        devices_after_logout: sim.devices().len(),
    };

    drop(script);
    runtime.await?;

    Ok(report)
}

/// Render a channel list, one channel per line.
pub fn render(channels: &[ChannelViewModel]) -> String {
    channels
        .iter()
        .map(|vm| {
            let flags: Vec<&str> = [
                (vm.is_member, "member"),
                (vm.is_recommended, "recommended"),
                (vm.can_edit, "editable"),
            ]
            .into_iter()
            .filter_map(|(set, flag)| set.then_some(flag))
            .collect();
            let flags = if flags.is_empty() { "-".to_string() } else { flags.join(",") };
            format!("{} {} unread={} {}", vm.id, vm.name, vm.unread_count, flags)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn channel_id(channel_type: &ChannelType, index: usize) -> String {
    format!("{channel_type}:room-{index}")
}

/// Even rooms have the user as a member, odd rooms are recommended.
fn seed(sim: &SimTransport, config: &DemoConfig) {
    sim.set_user_role(&config.user, config.role);

    for index in 0..config.channels {
        let at = Timestamp(u64::try_from(index).unwrap_or(u64::MAX).saturating_add(1));
        let id = channel_id(&config.channel_type, index);
        let record = ChannelRecord::new(config.channel_type.clone(), id)
            .with_name(format!("Room {index}"))
            .with_message(format!("welcome to room {index}"), at);

        if index % 2 == 0 {
            sim.add_channel(record, &[(config.user.as_str(), config.role)]);
        } else {
            sim.add_channel(record.with_recommended(true), &[]);
        }
    }
}

struct Script {
    session: SessionHandle,
    updates: ChannelUpdates,
    snapshots: usize,
    last: Option<Snapshot>,
}

impl Script {
    async fn next_list(&mut self, step: &'static str) -> Result<(), DemoError> {
        let snapshot = match timeout(STEP_TIMEOUT, self.updates.recv()).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) | Err(_) => return Err(DemoError::Stalled { step }),
        };

        self.snapshots += 1;
        tracing::info!(step, channels = snapshot.len(), "channel list published");
        for line in render(&snapshot).lines() {
            tracing::info!("  {line}");
        }
        self.last = Some(snapshot);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(role: Role) -> DemoConfig {
        DemoConfig {
            user: "alice".to_string(),
            role,
            channel_type: ChannelType::default(),
            channels: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_lifecycle_as_admin() {
        let report = run(config(Role::Admin)).await.unwrap();

        assert_eq!(report.snapshots, 4);
        assert_eq!(report.peak_subscriptions, 1);
        assert_eq!(report.open_after_logout, 0);
        assert_eq!(report.devices_after_logout, 0);
        insta::assert_snapshot!(render(&report.final_list), @r"
        messaging:room-0 Room 0 unread=1 member,editable
        messaging:room-2 Room 2 unread=0 member,editable
        messaging:room-1 Room 1 unread=0 recommended
        messaging:announcements Announcements unread=0 member,editable
        ");
    }

    #[tokio::test(start_paused = true)]
    async fn members_cannot_edit() {
        let report = run(config(Role::Member)).await.unwrap();

        assert!(report.final_list.iter().all(|vm| !vm.can_edit));
        assert_eq!(report.final_list.len(), 4);
    }

    #[tokio::test]
    async fn anonymous_user_is_rejected() {
        let result = run(config(Role::Anonymous)).await;
        assert!(matches!(result, Err(DemoError::AnonymousUser)));
    }

    #[test]
    fn render_marks_channels_without_flags() {
        let vm = ChannelViewModel::from(&ChannelRecord::new(ChannelType::default(), "messaging:x"));
        assert_eq!(render(&[vm]), "messaging:x messaging:x unread=0 -");
    }
}
