//! Setting identities and typed values shared between client and daemon.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a mutable client setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    /// Launch the app when the machine starts
    AutoStart,
    /// Connect the tunnel as soon as the app launches
    AutoConnect,
    /// Block all traffic whenever the tunnel is down
    LockdownMode,
    /// Show system notifications for tunnel events
    SystemNotifications,
    /// Use a monochromatic tray icon
    MonochromaticTrayIcon,
    /// Detach the window from the tray
    UnpinnedWindow,
    /// Start with only the tray icon visible
    StartMinimized,
    /// Animate the connection map
    AnimateMap,
    /// UI language
    PreferredLocale,
}

impl SettingKey {
    /// All mutable settings, in display order.
    pub const ALL: [SettingKey; 9] = [
        SettingKey::AutoStart,
        SettingKey::AutoConnect,
        SettingKey::LockdownMode,
        SettingKey::SystemNotifications,
        SettingKey::MonochromaticTrayIcon,
        SettingKey::UnpinnedWindow,
        SettingKey::StartMinimized,
        SettingKey::AnimateMap,
        SettingKey::PreferredLocale,
    ];

    /// The value type this key carries.
    pub fn kind(&self) -> ValueKind {
        match self {
            SettingKey::PreferredLocale => ValueKind::Text,
            _ => ValueKind::Bool,
        }
    }

    /// Stable wire name of the setting.
    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::AutoStart => "auto_start",
            SettingKey::AutoConnect => "auto_connect",
            SettingKey::LockdownMode => "lockdown_mode",
            SettingKey::SystemNotifications => "system_notifications",
            SettingKey::MonochromaticTrayIcon => "monochromatic_tray_icon",
            SettingKey::UnpinnedWindow => "unpinned_window",
            SettingKey::StartMinimized => "start_minimized",
            SettingKey::AnimateMap => "animate_map",
            SettingKey::PreferredLocale => "preferred_locale",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type a setting's value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Text => write!(f, "text"),
        }
    }
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingValue {
    Bool(bool),
    Text(String),
}

impl SettingValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            SettingValue::Bool(_) => ValueKind::Bool,
            SettingValue::Text(_) => ValueKind::Text,
        }
    }

    /// Extract a boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(v) => Some(*v),
            SettingValue::Text(_) => None,
        }
    }

    /// Extract a text value, if this is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SettingValue::Bool(_) => None,
            SettingValue::Text(v) => Some(v),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::Text(v.to_owned())
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(v) => write!(f, "{v}"),
            SettingValue::Text(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_names_are_unique() {
        for (i, a) in SettingKey::ALL.iter().enumerate() {
            for b in &SettingKey::ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(SettingValue::from(true).kind(), ValueKind::Bool);
        assert_eq!(SettingValue::from("sv").kind(), ValueKind::Text);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(SettingValue::from(false).as_bool(), Some(false));
        assert_eq!(SettingValue::from(false).as_text(), None);
        assert_eq!(SettingValue::from("de").as_text(), Some("de"));
    }
}
