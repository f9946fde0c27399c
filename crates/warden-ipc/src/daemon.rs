//! In-process daemon double.
//!
//! The real daemon is a separate privileged process; its transport and
//! tunnel logic live outside this repository. This double mirrors the one
//! contract the client depends on: it owns the authoritative snapshot,
//! validates each mutation, commits it, and then pushes the full new
//! snapshot on its broadcast stream. The reply to a setter only acknowledges
//! the request; the value itself always travels via the push.
//!
//! Knobs for response delay, forced rejection and link drops exist so tests
//! and the demo client can exercise every failure path of the core.

use crate::channel::{ChannelError, LinkState};
use crate::keys::{SettingKey, SettingValue};
use crate::link::{DaemonLink, SetRequest};
use crate::snapshot::SettingsSnapshot;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Locales the daemon accepts for `preferred_locale`.
const SUPPORTED_LOCALES: &[&str] = &["en", "sv", "de", "es", "fr", "it", "nb"];

/// How many pushes a slow subscriber may fall behind.
const PUSH_BUFFER: usize = 64;

/// Authoritative settings owner, running as a task on the client runtime.
pub struct InProcessDaemon {
    state: Mutex<SettingsSnapshot>,
    snapshots: broadcast::Sender<SettingsSnapshot>,
    link_tx: watch::Sender<LinkState>,
    link_rx: watch::Receiver<LinkState>,
    reject_next: Mutex<Option<String>>,
    response_delay: Mutex<Option<Duration>>,
}

impl InProcessDaemon {
    /// Create a daemon owning the given initial settings.
    pub fn new(initial: SettingsSnapshot) -> Arc<Self> {
        let (snapshots, _) = broadcast::channel(PUSH_BUFFER);
        let (link_tx, link_rx) = watch::channel(LinkState::Up);
        Arc::new(Self {
            state: Mutex::new(initial),
            snapshots,
            link_tx,
            link_rx,
            reject_next: Mutex::new(None),
            response_delay: Mutex::new(None),
        })
    }

    /// Open a client link and spawn the serving task behind it.
    pub fn connect(self: &Arc<Self>, deadline: Duration) -> DaemonLink {
        let (request_tx, request_rx) = mpsc::channel(16);
        let daemon = Arc::clone(self);
        tokio::spawn(daemon.serve(request_rx));
        DaemonLink::new(
            request_tx,
            self.snapshots.clone(),
            self.link_rx.clone(),
            deadline,
        )
    }

    /// Current authoritative settings.
    pub fn settings(&self) -> SettingsSnapshot {
        self.state.lock().unwrap().clone()
    }

    /// Push the current snapshot to all subscribers (the initial sync).
    pub fn push_current(&self) {
        let snapshot = self.settings();
        let _ = self.snapshots.send(snapshot);
    }

    /// Replace the settings and push, as a concurrent change by another
    /// client would.
    pub fn replace(&self, snapshot: SettingsSnapshot) {
        *self.state.lock().unwrap() = snapshot.clone();
        let _ = self.snapshots.send(snapshot);
    }

    /// Drop or restore the client link.
    pub fn set_link(&self, state: LinkState) {
        match state {
            LinkState::Up => info!("Daemon link restored"),
            LinkState::Down => warn!("Daemon link dropped"),
        }
        let _ = self.link_tx.send(state);
    }

    /// Reject the next mutation with the given reason.
    pub fn reject_next(&self, reason: &str) {
        *self.reject_next.lock().unwrap() = Some(reason.to_owned());
    }

    /// Delay every response by the given duration.
    pub fn set_response_delay(&self, delay: Option<Duration>) {
        *self.response_delay.lock().unwrap() = delay;
    }

    async fn serve(self: Arc<Self>, mut requests: mpsc::Receiver<SetRequest>) {
        debug!("Daemon task started");
        while let Some(request) = requests.recv().await {
            let delay = *self.response_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if !self.link_rx.borrow().is_up() {
                // Link dropped while the request was in the pipe
                let _ = request.reply.send(Err(ChannelError::Disconnected));
                continue;
            }

            let result = self.commit(request.key, request.value);
            let committed = result.is_ok();
            let _ = request.reply.send(result);
            if committed {
                self.push_current();
            }
        }
        debug!("Daemon task stopped");
    }

    /// Validate and commit one mutation against the authoritative snapshot.
    fn commit(&self, key: SettingKey, value: SettingValue) -> Result<(), ChannelError> {
        if let Some(reason) = self.reject_next.lock().unwrap().take() {
            warn!("Rejecting {} = {}: {}", key, value, reason);
            return Err(ChannelError::BackendRejected(reason));
        }

        if key == SettingKey::PreferredLocale {
            let locale = value.as_text().unwrap_or_default();
            if !SUPPORTED_LOCALES.contains(&locale) {
                return Err(ChannelError::BackendRejected(format!(
                    "unsupported locale: {locale}"
                )));
            }
        }

        let mut state = self.state.lock().unwrap();
        let next = state
            .apply(key, value.clone())
            .map_err(|e| ChannelError::BackendRejected(e.to_string()))?;
        *state = next;
        info!("Committed {} = {}", key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::SettingsChannel;

    const DEADLINE: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_commit_then_push() {
        let daemon = InProcessDaemon::new(SettingsSnapshot::default());
        let link = daemon.connect(DEADLINE);
        let mut pushes = link.subscribe_snapshots();

        link.set_setting(SettingKey::AutoConnect, true.into())
            .await
            .unwrap();

        let pushed = pushes.recv().await.unwrap();
        assert!(pushed.auto_connect);
        assert!(daemon.settings().auto_connect);
    }

    #[tokio::test]
    async fn test_rejected_mutation_is_not_pushed() {
        let daemon = InProcessDaemon::new(SettingsSnapshot::default());
        let link = daemon.connect(DEADLINE);
        let mut pushes = link.subscribe_snapshots();

        let err = link
            .set_setting(SettingKey::PreferredLocale, "tlh".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::BackendRejected(_)));

        // No push happened; the snapshot is unchanged
        assert!(pushes.try_recv().is_err());
        assert_eq!(daemon.settings().preferred_locale, "en");
    }

    #[tokio::test]
    async fn test_wrong_kind_is_rejected() {
        let daemon = InProcessDaemon::new(SettingsSnapshot::default());
        let link = daemon.connect(DEADLINE);

        let err = link
            .set_setting(SettingKey::LockdownMode, "on".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::BackendRejected(_)));
    }

    #[tokio::test]
    async fn test_link_down_fails_fast() {
        let daemon = InProcessDaemon::new(SettingsSnapshot::default());
        let link = daemon.connect(DEADLINE);

        daemon.set_link(LinkState::Down);
        assert!(!link.is_connected());

        let err = link
            .set_setting(SettingKey::AutoStart, true.into())
            .await
            .unwrap_err();
        assert_eq!(err, ChannelError::Disconnected);
        // Nothing was committed
        assert!(!daemon.settings().auto_start);
    }

    #[tokio::test]
    async fn test_slow_daemon_times_out() {
        let daemon = InProcessDaemon::new(SettingsSnapshot::default());
        let link = daemon.connect(Duration::from_millis(20));
        daemon.set_response_delay(Some(Duration::from_millis(200)));

        let err = link
            .set_setting(SettingKey::AnimateMap, false.into())
            .await
            .unwrap_err();
        assert_eq!(err, ChannelError::Timeout);
    }

    #[tokio::test]
    async fn test_replace_pushes_to_subscribers() {
        let daemon = InProcessDaemon::new(SettingsSnapshot::default());
        let link = daemon.connect(DEADLINE);
        let mut pushes = link.subscribe_snapshots();

        // Another client changed a setting; every subscriber sees the push
        let changed = SettingsSnapshot::default()
            .apply(SettingKey::PreferredLocale, "de".into())
            .unwrap();
        daemon.replace(changed.clone());

        assert_eq!(pushes.recv().await.unwrap(), changed);
        assert_eq!(daemon.settings(), changed);
    }

    #[tokio::test]
    async fn test_forced_rejection() {
        let daemon = InProcessDaemon::new(SettingsSnapshot::default());
        let link = daemon.connect(DEADLINE);
        daemon.reject_next("policy denies auto-connect");

        let err = link
            .set_setting(SettingKey::AutoConnect, true.into())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChannelError::BackendRejected("policy denies auto-connect".into())
        );

        // Only the next mutation was rejected
        link.set_setting(SettingKey::AutoConnect, true.into())
            .await
            .unwrap();
    }
}
