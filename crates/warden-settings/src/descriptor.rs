//! Static per-setting policy.
//!
//! One descriptor per mutable setting, fixed at compile time. The gating
//! policy is an explicit flag (`confirm_on`), never inferred from the value:
//! enabling lockdown mode can cut the machine off the network, so only that
//! direction requires confirmation, while disabling it is an ordinary
//! toggle.

use warden_ipc::{SettingKey, SettingValue, ValueKind};

/// Immutable metadata for one mutable setting.
pub struct SettingDescriptor {
    /// The setting this descriptor governs
    pub key: SettingKey,
    /// Value type the daemon expects
    pub kind: ValueKind,
    /// Desired value that must be confirmed before it is sent, if any
    pub confirm_on: Option<SettingValue>,
    /// Shown when a mutation of this setting fails
    pub failure_message: &'static str,
    /// Shown by the confirmation dialog for gated changes
    pub confirmation_prompt: Option<&'static str>,
}

static DESCRIPTORS: [SettingDescriptor; 9] = [
    SettingDescriptor {
        key: SettingKey::AutoStart,
        kind: ValueKind::Bool,
        confirm_on: None,
        failure_message: "Failed to change launch on start-up",
        confirmation_prompt: None,
    },
    SettingDescriptor {
        key: SettingKey::AutoConnect,
        kind: ValueKind::Bool,
        confirm_on: None,
        failure_message: "Failed to change auto-connect",
        confirmation_prompt: None,
    },
    SettingDescriptor {
        key: SettingKey::LockdownMode,
        kind: ValueKind::Bool,
        confirm_on: Some(SettingValue::Bool(true)),
        failure_message: "Failed to change lockdown mode",
        confirmation_prompt: Some(
            "With lockdown mode enabled you must be connected to the VPN to \
             reach the internet. Disconnecting or quitting the app will block \
             your connection.",
        ),
    },
    SettingDescriptor {
        key: SettingKey::SystemNotifications,
        kind: ValueKind::Bool,
        confirm_on: None,
        failure_message: "Failed to change notifications",
        confirmation_prompt: None,
    },
    SettingDescriptor {
        key: SettingKey::MonochromaticTrayIcon,
        kind: ValueKind::Bool,
        confirm_on: None,
        failure_message: "Failed to change the tray icon",
        confirmation_prompt: None,
    },
    SettingDescriptor {
        key: SettingKey::UnpinnedWindow,
        kind: ValueKind::Bool,
        confirm_on: None,
        failure_message: "Failed to unpin the window",
        confirmation_prompt: None,
    },
    SettingDescriptor {
        key: SettingKey::StartMinimized,
        kind: ValueKind::Bool,
        confirm_on: None,
        failure_message: "Failed to change start minimized",
        confirmation_prompt: None,
    },
    SettingDescriptor {
        key: SettingKey::AnimateMap,
        kind: ValueKind::Bool,
        confirm_on: None,
        failure_message: "Failed to change map animations",
        confirmation_prompt: None,
    },
    SettingDescriptor {
        key: SettingKey::PreferredLocale,
        kind: ValueKind::Text,
        confirm_on: None,
        failure_message: "Failed to change the language",
        confirmation_prompt: None,
    },
];

/// Look up the descriptor for a setting.
pub fn descriptor(key: SettingKey) -> &'static SettingDescriptor {
    DESCRIPTORS
        .iter()
        .find(|d| d.key == key)
        .expect("every setting has a descriptor")
}
