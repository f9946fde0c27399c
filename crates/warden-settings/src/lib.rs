//! Warden Settings - Guarded Remote-Setting Mutations
//!
//! The daemon owns every VPN setting; the client only displays them and
//! requests changes. This crate is the layer that keeps those two honest:
//!
//! ```text
//! UI intent ──▶ SettingsController ──▶ ConfirmationGate (gated settings)
//!                      │
//!                      ▼
//!              SettingsChannel ──▶ daemon ──▶ snapshot push
//!                                                  │
//!                      ┌───────────────────────────┘
//!                      ▼
//!               SnapshotStore ──▶ UI re-render
//! ```
//!
//! # Guarantees
//!
//! - The displayed value of a setting is always either the store's current
//!   value or the desired value of the one outstanding request for that key.
//! - Security-critical changes (lockdown mode) never reach the channel
//!   before the user explicitly confirms them; cancel never calls it at all.
//! - A failed mutation reverts the display to the store's value and surfaces
//!   a recoverable error. Nothing here is fatal and nothing retries itself.
//! - A newer request for a key supersedes an older in-flight one; the stale
//!   outcome is discarded whenever it eventually arrives.

mod controller;
mod descriptor;
mod gate;
mod store;

pub use controller::{ControllerEvent, SettingsController};
pub use descriptor::{SettingDescriptor, descriptor};
pub use gate::{ConfirmationGate, GateState};
pub use store::SnapshotStore;
