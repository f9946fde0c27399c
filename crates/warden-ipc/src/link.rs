//! Client-side daemon link.
//!
//! `DaemonLink` implements [`SettingsChannel`] over an in-process request
//! pipe to the daemon task: one mpsc slot per outstanding request, a oneshot
//! for the reply, and a per-call deadline. Calls made while the link is down
//! fail immediately with `Disconnected` instead of queueing.

use crate::channel::{ChannelError, LinkState, SettingsChannel};
use crate::keys::{SettingKey, SettingValue};
use crate::snapshot::SettingsSnapshot;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

/// One settings mutation in flight to the daemon.
pub(crate) struct SetRequest {
    pub(crate) key: SettingKey,
    pub(crate) value: SettingValue,
    pub(crate) reply: oneshot::Sender<Result<(), ChannelError>>,
}

/// Channel to the daemon, held by the client core.
#[derive(Clone)]
pub struct DaemonLink {
    requests: mpsc::Sender<SetRequest>,
    snapshots: broadcast::Sender<SettingsSnapshot>,
    link: watch::Receiver<LinkState>,
    deadline: Duration,
}

impl DaemonLink {
    pub(crate) fn new(
        requests: mpsc::Sender<SetRequest>,
        snapshots: broadcast::Sender<SettingsSnapshot>,
        link: watch::Receiver<LinkState>,
        deadline: Duration,
    ) -> Self {
        Self {
            requests,
            snapshots,
            link,
            deadline,
        }
    }
}

impl SettingsChannel for DaemonLink {
    async fn set_setting(&self, key: SettingKey, value: SettingValue) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::Disconnected);
        }

        debug!("Requesting {} = {}", key, value);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(SetRequest {
                key,
                value,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ChannelError::Disconnected)?;

        match tokio::time::timeout(self.deadline, reply_rx).await {
            // Deadline elapsed before the daemon answered
            Err(_) => Err(ChannelError::Timeout),
            // Daemon dropped the request without answering
            Ok(Err(_)) => Err(ChannelError::Disconnected),
            Ok(Ok(result)) => result,
        }
    }

    fn is_connected(&self) -> bool {
        self.link.borrow().is_up()
    }

    fn subscribe_snapshots(&self) -> broadcast::Receiver<SettingsSnapshot> {
        self.snapshots.subscribe()
    }

    fn subscribe_link(&self) -> watch::Receiver<LinkState> {
        self.link.clone()
    }
}
