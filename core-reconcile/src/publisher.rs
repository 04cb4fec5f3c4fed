//! Latest-value slot for the pending set
//!
//! The coordinator overwrites the slot after every round; readers fetch the
//! current snapshot whenever they like or wait for the next change. Writers
//! never wait on readers and a reader may observe a snapshot one round old.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::pending::PendingSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSnapshot {
    /// 0 for the restored and initial sets, then one per polling round
    pub round: u32,
    pub pending: PendingSet,
    /// Set once nothing is pending; no further rounds follow
    pub converged: bool,
}

#[derive(Clone)]
pub struct PendingSetPublisher {
    sender: Arc<watch::Sender<PendingSnapshot>>,
}

impl PendingSetPublisher {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(PendingSnapshot::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Overwrite the slot
    pub fn publish(&self, round: u32, pending: PendingSet) {
        let converged = pending.is_empty();
        self.sender.send_replace(PendingSnapshot {
            round,
            pending,
            converged,
        });
    }

    pub fn latest(&self) -> PendingSnapshot {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PendingSnapshot> {
        self.sender.subscribe()
    }
}

impl Default for PendingSetPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackRecord;

    fn pending_with(title: &str) -> PendingSet {
        let mut set = PendingSet::new();
        set.extend(
            "Chill",
            &[TrackRecord::new(title, "X", "Y").with_file_name("a.mp3")],
        );
        set
    }

    #[test]
    fn test_publish_without_readers() {
        let publisher = PendingSetPublisher::new();
        publisher.publish(1, pending_with("Ocean"));

        let latest = publisher.latest();
        assert_eq!(latest.round, 1);
        assert!(!latest.converged);
        assert_eq!(latest.pending.track_count(), 1);
    }

    #[test]
    fn test_empty_set_is_converged() {
        let publisher = PendingSetPublisher::new();
        publisher.publish(3, PendingSet::new());
        assert!(publisher.latest().converged);
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest_only() {
        let publisher = PendingSetPublisher::new();
        let mut rx = publisher.subscribe();

        publisher.publish(1, pending_with("Ocean"));
        publisher.publish(2, pending_with("Desert"));

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.round, 2);
        assert_eq!(snapshot.pending.get("Chill").unwrap()[0].title, "Desert");
    }
}
