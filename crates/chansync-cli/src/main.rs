//! Channel sync demo binary.
//!
//! # Usage
//!
//! ```bash
//! # Member of a few seeded channels, with the pipeline logged at debug
//! chansync --user alice --channels 4 --log-level debug
//!
//! # Admin in a custom channel type
//! chansync --user bob --role admin --channel-type team
//! ```

use chansync_cli::demo::{self, DemoConfig};
use chansync_core::{ChannelType, Role, query::DEFAULT_CHANNEL_TYPE};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Channel sync demo
#[derive(Parser, Debug)]
#[command(name = "chansync")]
#[command(about = "Run a scripted channel sync session against an in-memory backend")]
#[command(version)]
struct Args {
    /// User to log in as
    #[arg(short, long, default_value = "demo-user")]
    user: String,

    /// Role of the user (guest, user, member, moderator, admin, owner)
    #[arg(short, long, default_value = "member")]
    role: Role,

    /// Channel type namespace to synchronize
    #[arg(long, default_value = DEFAULT_CHANNEL_TYPE)]
    channel_type: String,

    /// Number of channels to seed the backend with
    #[arg(long, default_value = "3")]
    channels: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = DemoConfig {
        user: args.user,
        role: args.role,
        channel_type: ChannelType::new(args.channel_type),
        channels: args.channels,
    };

    let report = demo::run(config).await?;
    tracing::info!(
        snapshots = report.snapshots,
        peak_subscriptions = report.peak_subscriptions,
        open_after_logout = report.open_after_logout,
        devices_after_logout = report.devices_after_logout,
        "demo finished"
    );

    Ok(())
}
