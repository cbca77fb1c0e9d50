//! Deferred cleanup of offline presence entries.
//!
//! The `user-offline` broadcast fires immediately on disconnect; only the
//! memory cleanup waits for the grace window, so a quick reconnect finds
//! its previous last-seen time still in place.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::tracker::PresenceTracker;

/// Periodically forgets offline users older than the grace window.
#[derive(Debug, Clone)]
pub struct PresenceReaper {
    tracker: Arc<PresenceTracker>,
    grace: Duration,
}

impl PresenceReaper {
    /// Create a reaper over `tracker`.
    pub fn new(tracker: Arc<PresenceTracker>, grace: Duration) -> Self {
        Self { tracker, grace }
    }

    /// Run one cleanup cycle. Returns the number of entries dropped.
    pub fn run_once(&self) -> usize {
        let dropped = self.tracker.reap(self.grace, Utc::now());
        if dropped > 0 {
            debug!(dropped, "Reaped offline presence entries");
        }
        dropped
    }

    /// Spawn the cleanup loop. It stops when `shutdown` fires.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.grace.max(Duration::from_secs(1));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.run_once();
                    }
                    _ = shutdown.recv() => break,
                }
            }
            info!("Presence reaper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stealth_core::types::UserId;
    use uuid::Uuid;

    #[test]
    fn test_run_once_keeps_recent_entries() {
        let tracker = Arc::new(PresenceTracker::new());
        let user = UserId::new();
        let conn = Uuid::new_v4();
        tracker.mark_online(user, conn);
        tracker.mark_offline(user, conn);

        let reaper = PresenceReaper::new(tracker.clone(), Duration::from_secs(60));
        assert_eq!(reaper.run_once(), 0);
        assert!(tracker.get(user).is_some());

        let eager = PresenceReaper::new(tracker.clone(), Duration::ZERO);
        assert_eq!(eager.run_once(), 1);
        assert!(tracker.get(user).is_none());
    }

    #[tokio::test]
    async fn test_spawned_loop_stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let reaper = PresenceReaper::new(Arc::new(PresenceTracker::new()), Duration::from_secs(1));
        let handle = reaper.spawn(rx);
        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
