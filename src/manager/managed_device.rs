// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Internal device wrapper for the device manager.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::event::DeviceId;
use crate::state::DeviceState;

use super::device_config::ConnectionPolicy;
use super::receiver::ReceiverDevice;
use super::watchdog::spawn_watchdog;

/// Internal representation of a receiver in the manager.
///
/// The receiver itself sits behind a mutex shared with its watchdog task,
/// so commands and reconnect attempts never interleave on the wire.
pub(crate) struct ManagedDevice {
    id: DeviceId,
    device: Arc<Mutex<ReceiverDevice>>,
    state_rx: watch::Receiver<DeviceState>,
    watchdog: Option<JoinHandle<()>>,
}

impl ManagedDevice {
    /// Wraps `device`, starting its watchdog if the policy enables one.
    pub fn new(device: ReceiverDevice, policy: &ConnectionPolicy) -> Self {
        let id = device.id().clone();
        let state_rx = device.watch_state();
        let device = Arc::new(Mutex::new(device));
        let watchdog = policy
            .watchdog_enabled
            .then(|| spawn_watchdog(Arc::clone(&device), policy.clone()));

        Self {
            id,
            device,
            state_rx,
            watchdog,
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    /// Returns a shared handle to the receiver.
    pub fn device(&self) -> Arc<Mutex<ReceiverDevice>> {
        Arc::clone(&self.device)
    }

    /// Returns the last published state without locking the receiver.
    pub fn state(&self) -> DeviceState {
        self.state_rx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.state_rx.clone()
    }

    pub fn has_watchdog(&self) -> bool {
        self.watchdog.is_some()
    }

    /// Stops the watchdog and closes the transport.
    pub async fn shutdown(mut self) {
        self.stop_watchdog();
        self.device.lock().await.disconnect().await;
    }

    fn stop_watchdog(&mut self) {
        if let Some(handle) = self.watchdog.take() {
            handle.abort();
        }
    }
}

impl Drop for ManagedDevice {
    fn drop(&mut self) {
        self.stop_watchdog();
    }
}

impl std::fmt::Debug for ManagedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedDevice")
            .field("id", &self.id)
            .field("connection", &self.state_rx.borrow().connection())
            .field("watchdog", &self.watchdog.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::DeviceConfig;
    use crate::state::ConnectionStatus;

    fn receiver(host: &str) -> ReceiverDevice {
        ReceiverDevice::new(DeviceConfig::tcp(host), ConnectionPolicy::immediate()).unwrap()
    }

    #[tokio::test]
    async fn watchdog_follows_policy() {
        let with = ManagedDevice::new(receiver("10.0.0.5"), &ConnectionPolicy::immediate());
        let without = ManagedDevice::new(
            receiver("10.0.0.6"),
            &ConnectionPolicy::immediate().without_watchdog(),
        );

        assert!(with.has_watchdog());
        assert!(!without.has_watchdog());
    }

    #[tokio::test]
    async fn state_is_read_from_watch_channel() {
        let managed = ManagedDevice::new(
            receiver("10.0.0.5"),
            &ConnectionPolicy::immediate().without_watchdog(),
        );

        assert_eq!(managed.id().as_str(), "10.0.0.5_53");
        assert_eq!(managed.state().connection(), ConnectionStatus::Disconnected);
        assert!(!managed.device().lock().await.is_connected());
    }

    #[tokio::test]
    async fn shutdown_aborts_watchdog() {
        let managed = ManagedDevice::new(receiver("10.0.0.5"), &ConnectionPolicy::immediate());
        let device = managed.device();

        managed.shutdown().await;

        // Only our handle remains once the watchdog task has been dropped.
        for _ in 0..10 {
            if Arc::strong_count(&device) == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&device), 1);
    }
}
