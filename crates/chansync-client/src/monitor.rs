//! Connectivity monitor.
//!
//! Filters the transport's connection-status stream down to `connected`
//! transitions. Every raw transition is logged; everything that is not
//! `connected` stops here.

use chansync_core::ConnectionStatus;

/// Marker emitted for each `connected` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connected;

/// Connection-status filter.
///
/// Restartable: [`ConnectivityMonitor::reset`] forgets the last status so a
/// fresh status subscription starts from a clean slate.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityMonitor {
    /// Last status observed. `None` before the first status.
    last: Option<ConnectionStatus>,
    /// `connected` statuses observed since creation.
    connected_count: u64,
}

impl ConnectivityMonitor {
    /// Create a monitor that has seen nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one status.
    ///
    /// Returns [`Connected`] for every `connected` status, including repeats.
    pub fn observe(&mut self, status: ConnectionStatus) -> Option<Connected> {
        match &self.last {
            Some(previous) => tracing::debug!(from = %previous, to = %status, "connection status"),
            None => tracing::debug!(to = %status, "connection status"),
        }

        let connected = status.is_connected();
        self.last = Some(status);

        if connected {
            self.connected_count += 1;
            Some(Connected)
        } else {
            None
        }
    }

    /// Last status observed. `None` if nothing observed since the last reset.
    pub fn last_status(&self) -> Option<&ConnectionStatus> {
        self.last.as_ref()
    }

    /// Number of `connected` statuses observed.
    pub fn connected_count(&self) -> u64 {
        self.connected_count
    }

    /// Forget the last status.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_connected_passes() {
        let mut monitor = ConnectivityMonitor::new();
        assert_eq!(monitor.observe(ConnectionStatus::Connecting), None);
        assert_eq!(monitor.observe(ConnectionStatus::Connected), Some(Connected));
        assert_eq!(monitor.observe(ConnectionStatus::Disconnecting), None);
        assert_eq!(monitor.observe(ConnectionStatus::Unknown("resuming".into())), None);
        assert_eq!(monitor.connected_count(), 1);
    }

    #[test]
    fn repeated_connected_is_not_deduplicated() {
        let mut monitor = ConnectivityMonitor::new();
        assert!(monitor.observe(ConnectionStatus::Connected).is_some());
        assert!(monitor.observe(ConnectionStatus::Connected).is_some());
        assert_eq!(monitor.connected_count(), 2);
    }

    #[test]
    fn reset_forgets_last_status() {
        let mut monitor = ConnectivityMonitor::new();
        let _ = monitor.observe(ConnectionStatus::Connected);
        monitor.reset();
        assert_eq!(monitor.last_status(), None);
        assert_eq!(monitor.connected_count(), 1);
    }
}
