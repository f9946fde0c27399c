//! Warden client entry point.
//!
//! Sets up logging, wires the daemon link into the snapshot store and the
//! mutation controller, and runs a short scripted session in place of the
//! real presentation layer: ordinary toggles, a gated lockdown change with
//! its confirmation round, and a daemon push after each commit.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;
use warden_ipc::{InProcessDaemon, SettingKey, SettingsChannel, SettingsSnapshot};
use warden_settings::{ControllerEvent, SettingsController, SnapshotStore};

/// How long one settings round trip may take before it counts as lost.
const CALL_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .compact()
        .init();

    info!("Warden client starting");

    // The daemon normally lives in a privileged process; the in-process
    // double exposes the same contract
    let daemon = InProcessDaemon::new(SettingsSnapshot::default());
    let link = daemon.connect(CALL_DEADLINE);

    let store = Arc::new(SnapshotStore::new());
    store.spawn_feed(link.subscribe_snapshots());

    let (controller, events) = SettingsController::new(Arc::new(link), store.clone());
    tokio::spawn(render(events));

    // Initial sync
    daemon.push_current();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Plain toggles apply optimistically
    controller.request(SettingKey::AutoConnect, true.into());
    controller.request(SettingKey::SystemNotifications, false.into());
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Lockdown mode is gated; nothing reaches the daemon until confirm
    controller.request(SettingKey::LockdownMode, true.into());
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.confirm();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The daemon refuses unsupported locales; the display reverts
    controller.request(SettingKey::PreferredLocale, "tlh".into());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let settings = store
        .current()
        .context("daemon never pushed the initial settings")?;
    info!(
        "Final settings: auto_connect={} notifications={} lockdown={} locale={}",
        settings.auto_connect,
        settings.system_notifications,
        settings.lockdown_mode,
        settings.preferred_locale
    );

    info!("Warden client shutting down");
    Ok(())
}

/// Stand-in for the presentation layer: log every controller event.
async fn render(mut events: mpsc::UnboundedReceiver<ControllerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ControllerEvent::DisplayChanged { key, value } => match value {
                Some(value) => info!("[ui] {} shows {}", key, value),
                None => info!("[ui] {} has no value yet", key),
            },
            ControllerEvent::ConfirmationRequired { key, desired, prompt } => {
                info!("[ui] confirm {} = {}? {}", key, desired, prompt);
            }
            ControllerEvent::MutationFailed { key, error, message } => {
                warn!("[ui] {}: {} ({})", key, message, error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_ipc::{DaemonLink, SettingValue};

    struct Session {
        daemon: Arc<InProcessDaemon>,
        store: Arc<SnapshotStore>,
        controller: Arc<SettingsController<DaemonLink>>,
    }

    /// Full wiring against the in-process daemon, synced to its snapshot.
    async fn start_session() -> Session {
        let daemon = InProcessDaemon::new(SettingsSnapshot::default());
        let link = daemon.connect(CALL_DEADLINE);
        let store = Arc::new(SnapshotStore::new());
        store.spawn_feed(link.subscribe_snapshots());
        let (controller, events) = SettingsController::new(Arc::new(link), store.clone());
        tokio::spawn(render(events));

        daemon.push_current();
        wait_until(|| store.current().is_some()).await;
        Session {
            daemon,
            store,
            controller,
        }
    }

    async fn wait_until(predicate: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !predicate() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("condition never became true");
    }

    #[tokio::test]
    async fn test_toggle_reaches_daemon_and_comes_back() {
        let session = start_session().await;

        session
            .controller
            .request(SettingKey::AutoConnect, true.into());

        wait_until(|| session.daemon.settings().auto_connect).await;
        wait_until(|| {
            session.store.current().map(|s| s.auto_connect) == Some(true)
        })
        .await;
        assert_eq!(
            session.controller.displayed(SettingKey::AutoConnect),
            Some(SettingValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_canceled_lockdown_never_reaches_daemon() {
        let session = start_session().await;

        session
            .controller
            .request(SettingKey::LockdownMode, true.into());
        wait_until(|| session.controller.confirmation_pending()).await;
        session.controller.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!session.daemon.settings().lockdown_mode);
        assert_eq!(
            session.controller.displayed(SettingKey::LockdownMode),
            Some(SettingValue::Bool(false))
        );
    }

    #[tokio::test]
    async fn test_confirmed_lockdown_is_committed() {
        let session = start_session().await;

        session
            .controller
            .request(SettingKey::LockdownMode, true.into());
        wait_until(|| session.controller.confirmation_pending()).await;
        session.controller.confirm();

        wait_until(|| session.daemon.settings().lockdown_mode).await;
        wait_until(|| {
            session.store.current().map(|s| s.lockdown_mode) == Some(true)
        })
        .await;
        assert_eq!(
            session.controller.displayed(SettingKey::LockdownMode),
            Some(SettingValue::Bool(true))
        );
    }

    #[tokio::test]
    async fn test_rejected_locale_reverts() {
        let session = start_session().await;

        session
            .controller
            .request(SettingKey::PreferredLocale, "tlh".into());

        wait_until(|| {
            session.controller.displayed(SettingKey::PreferredLocale)
                == Some(SettingValue::from("en"))
        })
        .await;
        assert_eq!(session.daemon.settings().preferred_locale, "en");
    }
}
