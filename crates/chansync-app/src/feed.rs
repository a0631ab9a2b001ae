//! Channel list feed.
//!
//! Hot, multicast publisher of full channel list snapshots. A new observer
//! first receives the latest snapshot, then every later snapshot in publish
//! order. Observers are independent; a slow observer skips ahead instead of
//! holding back the others.

use std::sync::Arc;

use chansync_core::ChannelViewModel;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// One published channel list.
pub type Snapshot = Arc<Vec<ChannelViewModel>>;

/// Publisher side of the feed.
///
/// Cloning shares the same feed.
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    sender: broadcast::Sender<Snapshot>,
    latest: Arc<Mutex<Option<Snapshot>>>,
}

impl ChannelFeed {
    /// Create a feed buffering up to `capacity` snapshots per observer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender, latest: Arc::new(Mutex::new(None)) }
    }

    /// Publish a full list replacement.
    pub fn publish(&self, channels: Vec<ChannelViewModel>) {
        let snapshot = Arc::new(channels);
        let mut latest = self.latest.lock();
        *latest = Some(Arc::clone(&snapshot));
        let observers = self.sender.send(snapshot).unwrap_or(0);
        tracing::trace!(observers, "published channel list");
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> ChannelUpdates {
        let latest = self.latest.lock();
        ChannelUpdates { replay: latest.clone(), receiver: self.sender.subscribe() }
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> Option<Snapshot> {
        self.latest.lock().clone()
    }
}

/// Observer side of the feed.
#[derive(Debug)]
pub struct ChannelUpdates {
    replay: Option<Snapshot>,
    receiver: broadcast::Receiver<Snapshot>,
}

impl ChannelUpdates {
    /// Next snapshot.
    ///
    /// Returns `None` only once the session runtime has shut down.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        if let Some(snapshot) = self.replay.take() {
            return Some(snapshot);
        }

        loop {
            match self.receiver.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "channel feed observer lagged, skipping ahead");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Convert into a stream of snapshots.
    pub fn into_stream(self) -> BoxStream<'static, Snapshot> {
        stream::unfold(self, |mut updates| async move {
            updates.recv().await.map(|snapshot| (snapshot, updates))
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use chansync_core::{ChannelRecord, ChannelType, project};

    use super::*;

    fn list(ids: &[&str]) -> Vec<ChannelViewModel> {
        let records: Vec<ChannelRecord> =
            ids.iter().map(|id| ChannelRecord::new(ChannelType::default(), *id)).collect();
        project(&records)
    }

    fn ids(snapshot: &Snapshot) -> Vec<String> {
        snapshot.iter().map(|vm| vm.id.clone()).collect()
    }

    #[tokio::test]
    async fn late_observer_gets_latest_then_updates() {
        let feed = ChannelFeed::new(8);
        feed.publish(list(&["a"]));
        feed.publish(list(&["a", "b"]));

        let mut updates = feed.subscribe();
        feed.publish(list(&["a", "b", "c"]));

        assert_eq!(updates.recv().await.as_ref().map(ids), Some(vec!["a".into(), "b".into()]));
        assert_eq!(updates.recv().await.map(|s| s.len()), Some(3));
    }

    #[tokio::test]
    async fn observers_are_independent() {
        let feed = ChannelFeed::new(8);
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();

        feed.publish(list(&["a"]));

        assert_eq!(first.recv().await.map(|s| s.len()), Some(1));
        assert_eq!(second.recv().await.map(|s| s.len()), Some(1));
    }

    #[tokio::test]
    async fn lagging_observer_skips_ahead() {
        let feed = ChannelFeed::new(2);
        let mut updates = feed.subscribe();
        for n in 1..=5 {
            let ids: Vec<String> = (0..n).map(|i| format!("c{i}")).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            feed.publish(list(&refs));
        }

        assert_eq!(updates.recv().await.map(|s| s.len()), Some(4));
        assert_eq!(updates.recv().await.map(|s| s.len()), Some(5));
    }

    #[tokio::test]
    async fn stream_ends_when_feed_dropped() {
        let feed = ChannelFeed::new(4);
        let stream = feed.subscribe().into_stream();
        feed.publish(list(&["a"]));
        drop(feed);

        let collected: Vec<Snapshot> = stream.collect().await;
        assert_eq!(collected.len(), 1);
    }
}
