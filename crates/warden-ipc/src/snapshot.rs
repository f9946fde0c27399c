//! The immutable settings snapshot pushed by the daemon.
//!
//! A snapshot is the daemon's complete settings state at one point in time.
//! Clients replace their copy wholesale on every push and never mutate one
//! in place; `apply` exists for the daemon side, which commits a change by
//! building the next snapshot.

use crate::keys::{SettingKey, SettingValue, ValueKind};
use serde::{Deserialize, Serialize};

/// Complete view of all mutable settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    /// Launch the app on machine start-up
    pub auto_start: bool,
    /// Connect the tunnel when the app launches
    pub auto_connect: bool,
    /// Block all traffic whenever the tunnel is down
    pub lockdown_mode: bool,
    /// Show system notifications
    pub system_notifications: bool,
    /// Monochromatic tray icon
    pub monochromatic_tray_icon: bool,
    /// Window detached from the tray
    pub unpinned_window: bool,
    /// Start with only the tray icon visible
    pub start_minimized: bool,
    /// Animate the connection map
    pub animate_map: bool,
    /// UI language tag, e.g. "en"
    pub preferred_locale: String,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            auto_start: false,
            auto_connect: false,
            lockdown_mode: false,
            system_notifications: true,
            monochromatic_tray_icon: false,
            unpinned_window: false,
            start_minimized: false,
            animate_map: true,
            preferred_locale: "en".to_owned(),
        }
    }
}

impl SettingsSnapshot {
    /// Read one setting by key.
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::AutoStart => SettingValue::Bool(self.auto_start),
            SettingKey::AutoConnect => SettingValue::Bool(self.auto_connect),
            SettingKey::LockdownMode => SettingValue::Bool(self.lockdown_mode),
            SettingKey::SystemNotifications => SettingValue::Bool(self.system_notifications),
            SettingKey::MonochromaticTrayIcon => SettingValue::Bool(self.monochromatic_tray_icon),
            SettingKey::UnpinnedWindow => SettingValue::Bool(self.unpinned_window),
            SettingKey::StartMinimized => SettingValue::Bool(self.start_minimized),
            SettingKey::AnimateMap => SettingValue::Bool(self.animate_map),
            SettingKey::PreferredLocale => SettingValue::Text(self.preferred_locale.clone()),
        }
    }

    /// Build the next snapshot with one setting changed.
    ///
    /// Daemon-side only. Fails when the value's type does not match the key.
    pub fn apply(&self, key: SettingKey, value: SettingValue) -> Result<Self, SnapshotError> {
        let mut next = self.clone();
        match (key, value) {
            (SettingKey::AutoStart, SettingValue::Bool(v)) => next.auto_start = v,
            (SettingKey::AutoConnect, SettingValue::Bool(v)) => next.auto_connect = v,
            (SettingKey::LockdownMode, SettingValue::Bool(v)) => next.lockdown_mode = v,
            (SettingKey::SystemNotifications, SettingValue::Bool(v)) => {
                next.system_notifications = v
            }
            (SettingKey::MonochromaticTrayIcon, SettingValue::Bool(v)) => {
                next.monochromatic_tray_icon = v
            }
            (SettingKey::UnpinnedWindow, SettingValue::Bool(v)) => next.unpinned_window = v,
            (SettingKey::StartMinimized, SettingValue::Bool(v)) => next.start_minimized = v,
            (SettingKey::AnimateMap, SettingValue::Bool(v)) => next.animate_map = v,
            (SettingKey::PreferredLocale, SettingValue::Text(v)) => next.preferred_locale = v,
            (key, value) => {
                return Err(SnapshotError::WrongKind {
                    key,
                    expected: key.kind(),
                    got: value.kind(),
                });
            }
        }
        Ok(next)
    }
}

/// Errors building a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("setting {key} expects a {expected} value, got {got}")]
    WrongKind {
        key: SettingKey,
        expected: ValueKind,
        got: ValueKind,
    },
}
