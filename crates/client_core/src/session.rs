use std::sync::Arc;

use shared::domain::{
    ChannelIntensity, ChannelName, ConnectionState, DeviceAddress, DeviceSnapshot,
};
use storage::{KeyValueStore, DEVICE_ADDRESS_KEY};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    channel_control::{ChannelControl, CommitOutcome},
    device_client::{DeviceApi, DeviceClientError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unchanged,
    /// A status read or toggle is already in flight.
    Busy,
    NotConnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Applied,
    Skipped(SkipReason),
    Failed(DeviceClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub address: DeviceAddress,
    pub connection: ConnectionState,
    pub snapshot: DeviceSnapshot,
    pub error: Option<String>,
    pub busy: bool,
}

impl SessionView {
    /// Connection failures offer a retry; other errors are shown inline.
    pub fn offers_retry(&self) -> bool {
        self.connection == ConnectionState::Disconnected && self.error.is_some()
    }
}

struct SessionState {
    address: DeviceAddress,
    connection: ConnectionState,
    snapshot: DeviceSnapshot,
    error: Option<String>,
    busy: bool,
}

pub struct SessionController {
    device: Arc<dyn DeviceApi>,
    store: Arc<dyn KeyValueStore>,
    // Never held across a device call.
    inner: Mutex<SessionState>,
}

impl SessionController {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        store: Arc<dyn KeyValueStore>,
        address: DeviceAddress,
    ) -> Self {
        Self {
            device,
            store,
            inner: Mutex::new(SessionState {
                address,
                connection: ConnectionState::Connecting,
                snapshot: DeviceSnapshot::default(),
                error: None,
                busy: false,
            }),
        }
    }

    /// Starts from the persisted address, or `default_address` when nothing
    /// usable was stored.
    pub async fn load(
        device: Arc<dyn DeviceApi>,
        store: Arc<dyn KeyValueStore>,
        default_address: DeviceAddress,
    ) -> Self {
        let address = match store.get(DEVICE_ADDRESS_KEY).await {
            Ok(Some(saved)) if !saved.trim().is_empty() => DeviceAddress::new(saved),
            Ok(_) => default_address,
            Err(err) => {
                warn!(error = %err, "failed to read saved device address; using default");
                default_address
            }
        };
        Self::new(device, store, address)
    }

    pub async fn view(&self) -> SessionView {
        let inner = self.inner.lock().await;
        SessionView {
            address: inner.address.clone(),
            connection: inner.connection,
            snapshot: inner.snapshot.clone(),
            error: inner.error.clone(),
            busy: inner.busy,
        }
    }

    pub async fn address(&self) -> DeviceAddress {
        self.inner.lock().await.address.clone()
    }

    pub async fn channel_value(&self, channel: ChannelName) -> ChannelIntensity {
        self.inner.lock().await.snapshot.channel(channel)
    }

    pub async fn start(&self) -> SessionOutcome {
        self.refresh(None).await
    }

    pub async fn retry(&self) -> SessionOutcome {
        self.refresh(None).await
    }

    pub async fn commit_address(&self, address: DeviceAddress) -> SessionOutcome {
        self.refresh(Some(address)).await
    }

    pub async fn toggle(&self) -> SessionOutcome {
        let address = {
            let mut inner = self.inner.lock().await;
            if inner.connection != ConnectionState::Connected {
                return SessionOutcome::Skipped(SkipReason::NotConnected);
            }
            if inner.busy {
                return SessionOutcome::Skipped(SkipReason::Busy);
            }
            inner.busy = true;
            inner.error = None;
            inner.address.clone()
        };

        info!(%address, "toggling device power");
        let result = self.device.toggle_power(&address).await;

        let mut inner = self.inner.lock().await;
        inner.busy = false;
        match result {
            Ok(status) => {
                inner.snapshot = status.apply_to(&inner.snapshot);
                info!(%address, power = %inner.snapshot.power, "device power toggled");
                SessionOutcome::Applied
            }
            Err(err) => {
                inner.error = Some(describe_failure(&address, &err));
                // A device that answered is still reachable.
                if err.is_connectivity() {
                    inner.connection = ConnectionState::Disconnected;
                }
                SessionOutcome::Failed(err)
            }
        }
    }

    pub async fn commit_channel(&self, control: &mut ChannelControl) -> CommitOutcome {
        let address = self.address().await;
        let outcome = control.commit(self.device.as_ref(), &address).await;
        if let CommitOutcome::Committed(value) = outcome {
            self.apply_channel_value(control.channel(), value).await;
        }
        outcome
    }

    pub async fn apply_channel_value(&self, channel: ChannelName, value: ChannelIntensity) {
        let mut inner = self.inner.lock().await;
        inner.snapshot = inner.snapshot.with_channel(channel, value);
    }

    async fn refresh(&self, next_address: Option<DeviceAddress>) -> SessionOutcome {
        let address = {
            let mut inner = self.inner.lock().await;
            if next_address.as_ref() == Some(&inner.address) {
                return SessionOutcome::Skipped(SkipReason::Unchanged);
            }
            if inner.busy {
                return SessionOutcome::Skipped(SkipReason::Busy);
            }
            if let Some(next) = next_address {
                inner.address = next;
            }
            inner.busy = true;
            inner.error = None;
            inner.connection = ConnectionState::Connecting;
            inner.address.clone()
        };

        info!(%address, "reading device status");
        let result = self.device.read_status(&address).await;

        let outcome = {
            let mut inner = self.inner.lock().await;
            inner.busy = false;
            match result {
                Ok(status) => {
                    inner.snapshot = status.apply_to(&inner.snapshot);
                    inner.connection = ConnectionState::Connected;
                    SessionOutcome::Applied
                }
                Err(err) => {
                    inner.error = Some(describe_failure(&address, &err));
                    inner.connection = ConnectionState::Disconnected;
                    SessionOutcome::Failed(err)
                }
            }
        };

        if outcome == SessionOutcome::Applied {
            info!(%address, "device connected");
            if let Err(err) = self.store.set(DEVICE_ADDRESS_KEY, address.as_str()).await {
                warn!(%address, error = %err, "failed to persist device address");
            }
        }
        outcome
    }
}

pub fn describe_failure(address: &DeviceAddress, err: &DeviceClientError) -> String {
    if err.is_connectivity() {
        format!(
            "Could not connect to device at {address}. Please check the IP address and ensure the device is online."
        )
    } else {
        err.to_string()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
