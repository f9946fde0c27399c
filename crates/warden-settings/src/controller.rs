//! Guarded mutation controller.
//!
//! The only component allowed to call the channel's setter. Every
//! user-initiated setting change goes through the same policy:
//!
//! 1. Changes flagged by their descriptor are parked in the confirmation
//!    gate; nothing is sent or displayed until the user confirms.
//! 2. Ungated changes apply optimistically: the displayed value flips
//!    immediately and the round trip runs in the background.
//! 3. A successful round trip keeps the optimistic value on screen until
//!    the store pushes the authoritative snapshot, which always wins, even
//!    when it differs from what was requested.
//! 4. A failed round trip reverts the display to the store's value and
//!    surfaces a recoverable error. Retry is always a fresh user request.
//! 5. A newer request for the same key supersedes an older in-flight one;
//!    the stale outcome is discarded by sequence comparison when it arrives.
//!
//! Transport failures latch the controller offline. While latched, requests
//! fail fast without touching the channel; the latch clears when the link
//! watch reports up again.

use crate::descriptor::descriptor;
use crate::gate::ConfirmationGate;
use crate::store::SnapshotStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use warden_ipc::{ChannelError, LinkState, SettingKey, SettingValue, SettingsChannel, SettingsSnapshot};

/// Events surfaced to the presentation layer.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// The value the UI should show for a setting changed.
    ///
    /// `None` means no value is known yet (no snapshot, no request).
    DisplayChanged {
        key: SettingKey,
        value: Option<SettingValue>,
    },
    /// A gated change needs explicit user approval before anything is sent.
    ConfirmationRequired {
        key: SettingKey,
        desired: SettingValue,
        prompt: &'static str,
    },
    /// A mutation failed and the display has been reverted.
    MutationFailed {
        key: SettingKey,
        error: ChannelError,
        message: &'static str,
    },
}

/// Where an outstanding request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// The round trip has not resolved yet
    InFlight,
    /// The daemon accepted it; waiting for the snapshot push
    AwaitingPush,
}

/// The one outstanding mutation for a key.
struct MutationRequest {
    seq: u64,
    desired: SettingValue,
    phase: Phase,
}

/// Applies user-initiated setting changes against the daemon.
pub struct SettingsController<C: SettingsChannel> {
    channel: Arc<C>,
    store: Arc<SnapshotStore>,
    pending: Mutex<HashMap<SettingKey, MutationRequest>>,
    gate: Mutex<ConfirmationGate>,
    /// Set after a transport failure; cleared on the link-up signal
    offline: AtomicBool,
    next_seq: AtomicU64,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl<C: SettingsChannel> SettingsController<C> {
    /// Create the controller and its event stream.
    ///
    /// Spawns the reconciler (store watcher) and link watcher tasks; must be
    /// called from within a runtime.
    pub fn new(
        channel: Arc<C>,
        store: Arc<SnapshotStore>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let offline = !channel.is_connected();
        let controller = Arc::new(Self {
            channel,
            store,
            pending: Mutex::new(HashMap::new()),
            gate: Mutex::new(ConfirmationGate::new()),
            offline: AtomicBool::new(offline),
            next_seq: AtomicU64::new(0),
            events,
        });
        controller.spawn_reconciler();
        controller.spawn_link_watch();
        (controller, event_rx)
    }

    /// Handle a user intent to change one setting.
    ///
    /// Gated changes are parked for confirmation; everything else applies
    /// optimistically and goes to the daemon.
    pub fn request(self: &Arc<Self>, key: SettingKey, desired: SettingValue) {
        let desc = descriptor(key);
        if desc.confirm_on.as_ref() == Some(&desired) {
            debug!("Intercepting {} = {} for confirmation", key, desired);
            let displaced = self.gate.lock().unwrap().intercept(key, desired.clone());
            if let Some((old_key, _)) = displaced {
                // The older unconfirmed intent is dropped; make sure no
                // speculative flip of its widget survives
                if old_key != key {
                    self.emit_display(old_key, self.store.value(old_key));
                }
            }
            self.emit(ControllerEvent::ConfirmationRequired {
                key,
                desired,
                prompt: desc.confirmation_prompt.unwrap_or(desc.failure_message),
            });
            return;
        }
        self.apply(key, desired);
    }

    /// User confirmed the pending gated change: send it as a normal request.
    pub fn confirm(self: &Arc<Self>) {
        if let Some((key, desired)) = self.gate.lock().unwrap().confirm() {
            info!("Confirmed {} = {}", key, desired);
            self.apply(key, desired);
        }
    }

    /// User canceled the pending gated change: nothing is sent, and the
    /// displayed value snaps back to the store's.
    pub fn cancel(&self) {
        if let Some((key, desired)) = self.gate.lock().unwrap().cancel() {
            debug!("Canceled {} = {}", key, desired);
            self.emit_display(key, self.store.value(key));
        }
    }

    /// The value the UI should currently show for a setting.
    ///
    /// An outstanding request's desired value, or the store's value, never
    /// anything else.
    pub fn displayed(&self, key: SettingKey) -> Option<SettingValue> {
        if let Some(request) = self.pending.lock().unwrap().get(&key) {
            return Some(request.desired.clone());
        }
        self.store.value(key)
    }

    /// Whether requests currently fail fast because the daemon is
    /// unreachable.
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Whether a gated change is waiting for the user.
    pub fn confirmation_pending(&self) -> bool {
        self.gate.lock().unwrap().is_pending()
    }

    /// The ungated path: optimistic apply plus background round trip.
    fn apply(self: &Arc<Self>, key: SettingKey, desired: SettingValue) {
        if self.is_offline() || !self.channel.is_connected() {
            // Fail fast without the call; no optimistic flip to revert
            warn!("Dropping {} = {}: daemon unreachable", key, desired);
            self.emit(ControllerEvent::MutationFailed {
                key,
                error: ChannelError::Disconnected,
                message: descriptor(key).failure_message,
            });
            return;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().insert(
            key,
            MutationRequest {
                seq,
                desired: desired.clone(),
                phase: Phase::InFlight,
            },
        );
        self.emit_display(key, Some(desired.clone()));

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.channel.set_setting(key, desired).await;
            this.settle(key, seq, result);
        });
    }

    /// Resolve one round trip's outcome, honoring superseding.
    fn settle(&self, key: SettingKey, seq: u64, result: Result<(), ChannelError>) {
        {
            let mut pending = self.pending.lock().unwrap();
            match pending.get_mut(&key) {
                Some(request) if request.seq == seq => match result {
                    Ok(()) => {
                        // Accepted; keep the optimistic value on screen
                        // until the authoritative push arrives
                        request.phase = Phase::AwaitingPush;
                        return;
                    }
                    Err(_) => {
                        pending.remove(&key);
                    }
                },
                // A newer request superseded this one; its outcome is void
                _ => {
                    debug!("Discarding stale outcome for {}", key);
                    return;
                }
            }
        }

        let error = result.unwrap_err();
        warn!("Mutation of {} failed: {}", key, error);
        if error.is_transport() {
            self.offline.store(true, Ordering::SeqCst);
        }
        self.emit_display(key, self.store.value(key));
        self.emit(ControllerEvent::MutationFailed {
            key,
            error,
            message: descriptor(key).failure_message,
        });
    }

    /// Drop requests satisfied by a push and re-render their keys.
    ///
    /// The pushed value wins even when it differs from what was requested,
    /// e.g. after a concurrent change by another client.
    fn reconcile(&self, snapshot: &SettingsSnapshot) {
        let settled: Vec<SettingKey> = {
            let mut pending = self.pending.lock().unwrap();
            let keys: Vec<SettingKey> = pending
                .iter()
                .filter(|(_, request)| request.phase == Phase::AwaitingPush)
                .map(|(key, _)| *key)
                .collect();
            for key in &keys {
                pending.remove(key);
            }
            keys
        };
        for key in settled {
            self.emit_display(key, Some(snapshot.get(key)));
        }
    }

    fn spawn_reconciler(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let mut updates = this.store.subscribe();
        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(snapshot) => this.reconcile(&snapshot),
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // The next recv returns a newer snapshot; reconciling
                        // against that one is just as correct
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    fn spawn_link_watch(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let mut link = this.channel.subscribe_link();
        tokio::spawn(async move {
            while link.changed().await.is_ok() {
                let state = *link.borrow_and_update();
                match state {
                    LinkState::Up => {
                        if this.offline.swap(false, Ordering::SeqCst) {
                            info!("Daemon reachable again, accepting requests");
                        }
                    }
                    LinkState::Down => {
                        this.offline.store(true, Ordering::SeqCst);
                        warn!("Daemon link down, failing requests fast");
                    }
                }
            }
        });
    }

    fn emit_display(&self, key: SettingKey, value: Option<SettingValue>) {
        self.emit(ControllerEvent::DisplayChanged { key, value });
    }

    fn emit(&self, event: ControllerEvent) {
        // The UI dropping its receiver only means nobody is rendering
        let _ = self.events.send(event);
    }
}
