//! Confirmation gate for security-critical setting changes.
//!
//! A small state machine sitting between the controller and the channel for
//! settings flagged as requiring confirmation. An intercepted change is held
//! in `Pending` until the user answers: confirm hands the change back to the
//! controller's ungated path, cancel discards it without the channel ever
//! being called.
//!
//! # Behavior
//!
//! - Only one change can be pending at a time. A second intercept, for the
//!   same setting or another gated one, replaces the pending change; the
//!   displaced entry is returned so the controller can revert its display.
//! - Confirm and cancel on an idle gate are no-ops that return `None`,
//!   so a stray dialog event cannot trigger a mutation.

use warden_ipc::{SettingKey, SettingValue};

/// What the gate is currently doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    /// No confirmation is pending
    Idle,
    /// Waiting for the user to confirm or cancel a change
    Pending {
        key: SettingKey,
        desired: SettingValue,
    },
}

/// Holds at most one unconfirmed setting change.
pub struct ConfirmationGate {
    state: GateState,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self { state: GateState::Idle }
    }

    /// Whether a change is waiting for the user.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, GateState::Pending { .. })
    }

    /// The pending change, if any.
    pub fn pending(&self) -> Option<(SettingKey, &SettingValue)> {
        match &self.state {
            GateState::Idle => None,
            GateState::Pending { key, desired } => Some((*key, desired)),
        }
    }

    /// Hold a change until the user answers.
    ///
    /// Returns the displaced pending change when one was already waiting;
    /// the newer intent wins and the old one must be reverted by the caller.
    pub fn intercept(
        &mut self,
        key: SettingKey,
        desired: SettingValue,
    ) -> Option<(SettingKey, SettingValue)> {
        match std::mem::replace(&mut self.state, GateState::Pending { key, desired }) {
            GateState::Idle => None,
            GateState::Pending { key, desired } => Some((key, desired)),
        }
    }

    /// User confirmed: release the pending change for sending.
    pub fn confirm(&mut self) -> Option<(SettingKey, SettingValue)> {
        match std::mem::replace(&mut self.state, GateState::Idle) {
            GateState::Idle => None,
            GateState::Pending { key, desired } => Some((key, desired)),
        }
    }

    /// User canceled: discard the pending change.
    ///
    /// Returns what was discarded so the caller can revert any speculative
    /// display flip; the change itself is never sent.
    pub fn cancel(&mut self) -> Option<(SettingKey, SettingValue)> {
        match std::mem::replace(&mut self.state, GateState::Idle) {
            GateState::Idle => None,
            GateState::Pending { key, desired } => Some((key, desired)),
        }
    }
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let gate = ConfirmationGate::new();

        assert!(!gate.is_pending());
        assert!(gate.pending().is_none());
    }

    #[test]
    fn test_confirm_releases_the_change() {
        let mut gate = ConfirmationGate::new();
        gate.intercept(SettingKey::LockdownMode, true.into());
        assert!(gate.is_pending());

        let released = gate.confirm().unwrap();
        assert_eq!(released, (SettingKey::LockdownMode, SettingValue::Bool(true)));
        assert!(!gate.is_pending());
    }

    #[test]
    fn test_cancel_discards_the_change() {
        let mut gate = ConfirmationGate::new();
        gate.intercept(SettingKey::LockdownMode, true.into());

        let discarded = gate.cancel().unwrap();
        assert_eq!(discarded.0, SettingKey::LockdownMode);
        assert!(!gate.is_pending());
        // A confirm after cancel must not resurrect the change
        assert!(gate.confirm().is_none());
    }

    #[test]
    fn test_idle_confirm_and_cancel_are_noops() {
        let mut gate = ConfirmationGate::new();

        assert!(gate.confirm().is_none());
        assert!(gate.cancel().is_none());
    }

    #[test]
    fn test_second_intercept_replaces_pending() {
        let mut gate = ConfirmationGate::new();
        assert!(gate.intercept(SettingKey::LockdownMode, true.into()).is_none());

        let displaced = gate
            .intercept(SettingKey::AutoConnect, false.into())
            .unwrap();
        assert_eq!(displaced, (SettingKey::LockdownMode, SettingValue::Bool(true)));

        // The newer intent is what confirm releases
        let released = gate.confirm().unwrap();
        assert_eq!(released, (SettingKey::AutoConnect, SettingValue::Bool(false)));
    }
}
