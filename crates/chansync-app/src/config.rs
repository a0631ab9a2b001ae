//! Session configuration.

use chansync_client::SyncConfig;

/// Default number of snapshots buffered per feed observer.
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Session runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Channel list synchronizer settings
    pub sync: SyncConfig,
    /// Snapshots buffered per feed observer before it starts skipping
    pub feed_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { sync: SyncConfig::default(), feed_capacity: DEFAULT_FEED_CAPACITY }
    }
}
