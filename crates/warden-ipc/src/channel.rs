//! The asynchronous settings channel contract.
//!
//! Everything the client core needs from the daemon connection: one setter
//! that commits or fails as a whole, the snapshot push stream, and the link
//! state used to fail fast while the daemon is unreachable.

use crate::keys::{SettingKey, SettingValue};
use crate::snapshot::SettingsSnapshot;
use std::future::Future;
use tokio::sync::{broadcast, watch};

/// Failures of a single settings round trip.
///
/// None of these are fatal; the worst outcome for the client is a setting
/// visually reverting to its last daemon-confirmed value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("daemon connection is down")]
    Disconnected,

    #[error("daemon rejected the change: {0}")]
    BackendRejected(String),

    #[error("daemon did not respond in time")]
    Timeout,
}

impl ChannelError {
    /// Whether the failure means the daemon is unreachable.
    ///
    /// A timed-out daemon is indistinguishable from an unreachable one
    /// until the link reports up again, so both latch the client offline.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChannelError::Disconnected | ChannelError::Timeout)
    }
}

/// Connection state of the daemon link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Up,
    Down,
}

impl LinkState {
    pub fn is_up(&self) -> bool {
        matches!(self, LinkState::Up)
    }
}

/// Asynchronous request/response bridge to the privileged daemon.
///
/// Mutations commit or fail as a whole. A resolved `set_setting` means the
/// request was accepted for processing, never that the value changed; the
/// authoritative value arrives separately on the snapshot stream. The
/// channel must not update any client cache itself, otherwise a push racing
/// the call's resolution could be overwritten with a stale value.
pub trait SettingsChannel: Send + Sync + 'static {
    /// Ask the daemon to change one setting.
    ///
    /// May suspend until the daemon responds or the connection drops.
    fn set_setting(
        &self,
        key: SettingKey,
        value: SettingValue,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Current link state, for fail-fast checks.
    fn is_connected(&self) -> bool;

    /// Subscribe to full-snapshot pushes, in daemon emission order.
    fn subscribe_snapshots(&self) -> broadcast::Receiver<SettingsSnapshot>;

    /// Watch link up/down transitions (the reconnect signal).
    fn subscribe_link(&self) -> watch::Receiver<LinkState>;
}
