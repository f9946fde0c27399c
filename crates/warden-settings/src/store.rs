//! Process-local cache of the daemon's settings.
//!
//! The store holds the last snapshot the daemon pushed and fans it out to
//! subscribers. It is the single source of truth on the client side: the
//! only writer is the feed task forwarding daemon pushes, never a mutation
//! call's return value. Every push is delivered to subscribers in order and
//! without coalescing; a push identical to the previous one still goes out,
//! since consumers may use it to dismiss an in-flight "applying" indicator.
//!
//! One store exists per app session.

use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use warden_ipc::{SettingKey, SettingValue, SettingsSnapshot};

/// How many pushes a slow subscriber may fall behind.
const SUBSCRIBER_BUFFER: usize = 64;

/// Last-known-good view of the daemon's settings.
pub struct SnapshotStore {
    current: RwLock<Option<SettingsSnapshot>>,
    updates: broadcast::Sender<SettingsSnapshot>,
}

impl SnapshotStore {
    /// Create an empty store; it holds nothing until the first push.
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            current: RwLock::new(None),
            updates,
        }
    }

    /// The latest pushed snapshot, or `None` before the first push.
    pub fn current(&self) -> Option<SettingsSnapshot> {
        self.current.read().unwrap().clone()
    }

    /// The latest pushed value of one setting.
    pub fn value(&self, key: SettingKey) -> Option<SettingValue> {
        self.current.read().unwrap().as_ref().map(|s| s.get(key))
    }

    /// Subscribe to every subsequent push, in arrival order.
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsSnapshot> {
        self.updates.subscribe()
    }

    /// Replace the cached snapshot and notify subscribers.
    ///
    /// Called only by the feed task (and tests).
    pub fn push(&self, snapshot: SettingsSnapshot) {
        debug!("Settings snapshot updated");
        *self.current.write().unwrap() = Some(snapshot.clone());
        // Send fails only when no subscriber exists, which is fine
        let _ = self.updates.send(snapshot);
    }

    /// Forward the daemon's push stream into this store.
    ///
    /// Spawned once at session start; stops when the stream closes.
    pub fn spawn_feed(
        self: &Arc<Self>,
        mut pushes: broadcast::Receiver<SettingsSnapshot>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match pushes.recv().await {
                    Ok(snapshot) => store.push(snapshot),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed intermediates; the next recv returns the
                        // oldest retained push and ordering is preserved
                        warn!("Snapshot feed lagged, skipped {} pushes", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Snapshot feed stopped");
        })
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_until_first_push() {
        let store = SnapshotStore::new();

        assert!(store.current().is_none());
        assert!(store.value(SettingKey::AutoConnect).is_none());
    }

    #[test]
    fn test_push_replaces_wholesale() {
        let store = SnapshotStore::new();
        store.push(SettingsSnapshot::default());

        let changed = SettingsSnapshot::default()
            .apply(SettingKey::LockdownMode, true.into())
            .unwrap();
        store.push(changed.clone());

        assert_eq!(store.current(), Some(changed));
        assert_eq!(
            store.value(SettingKey::LockdownMode),
            Some(SettingValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_identical_pushes_are_not_coalesced() {
        let store = SnapshotStore::new();
        let mut updates = store.subscribe();

        let snapshot = SettingsSnapshot::default();
        store.push(snapshot.clone());
        store.push(snapshot.clone());

        assert_eq!(updates.recv().await.unwrap(), snapshot);
        assert_eq!(updates.recv().await.unwrap(), snapshot);
    }

    #[tokio::test]
    async fn test_pushes_arrive_in_order() {
        let store = SnapshotStore::new();
        let mut updates = store.subscribe();

        let first = SettingsSnapshot::default();
        let second = first.apply(SettingKey::AutoStart, true.into()).unwrap();
        let third = second.apply(SettingKey::AutoStart, false.into()).unwrap();
        store.push(first.clone());
        store.push(second.clone());
        store.push(third.clone());

        assert_eq!(updates.recv().await.unwrap(), first);
        assert_eq!(updates.recv().await.unwrap(), second);
        assert_eq!(updates.recv().await.unwrap(), third);
    }

    #[tokio::test]
    async fn test_feed_forwards_daemon_pushes() {
        let (daemon_tx, daemon_rx) = broadcast::channel(8);
        let store = Arc::new(SnapshotStore::new());
        store.spawn_feed(daemon_rx);

        let mut updates = store.subscribe();
        let snapshot = SettingsSnapshot::default();
        daemon_tx.send(snapshot.clone()).unwrap();

        assert_eq!(updates.recv().await.unwrap(), snapshot);
        assert_eq!(store.current(), Some(snapshot));
    }
}
