//! Warden IPC - Settings Channel to the Privileged Daemon
//!
//! The Warden client never owns VPN settings. The privileged daemon does,
//! and this crate is the client's view of it: typed setting identities, the
//! immutable settings snapshot the daemon pushes, and the asynchronous
//! channel used to request changes.
//!
//! # Contract
//!
//! - `set_setting` is a single round trip that commits or fails as a whole.
//!   A resolved call means "the daemon accepted the request", never "the
//!   value changed". The new value always arrives on the snapshot stream.
//! - The channel never writes any client-side cache. Snapshots are replaced
//!   wholesale by daemon pushes, keeping exactly one writer of settings
//!   state in the whole system.

mod channel;
mod daemon;
mod keys;
mod link;
mod snapshot;

pub use channel::{ChannelError, LinkState, SettingsChannel};
pub use daemon::InProcessDaemon;
pub use keys::{SettingKey, SettingValue, ValueKind};
pub use link::DaemonLink;
pub use snapshot::{SettingsSnapshot, SnapshotError};
