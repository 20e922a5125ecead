// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device manager for coordinating multiple NAD receivers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast, watch};

use crate::dispatch::{MediaPlayerCommand, StatusCode, handle_command};
use crate::error::{Error, Result};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::persistence::ConfigStore;
use crate::protocol::Connector;
use crate::state::DeviceState;

use super::device_config::{ConnectionPolicy, DeviceConfig};
use super::managed_device::ManagedDevice;
use super::receiver::ReceiverDevice;

/// Manager for coordinating multiple receivers.
///
/// Every receiver publishes onto the manager's event bus, so a single
/// subscription sees lifecycle, connection and state events for all of
/// them. Each receiver gets its own watchdog when the policy enables one.
///
/// # Examples
///
/// ```no_run
/// use nadav_lib::dispatch::MediaPlayerCommand;
/// use nadav_lib::manager::{DeviceConfig, DeviceManager};
///
/// #[tokio::main]
/// async fn main() -> nadav_lib::Result<()> {
///     let manager = DeviceManager::new();
///
///     let mut events = manager.subscribe();
///     tokio::spawn(async move {
///         while let Ok(event) = events.recv().await {
///             println!("Event: {:?}", event);
///         }
///     });
///
///     let id = manager
///         .add_device(DeviceConfig::tcp("192.168.1.40").with_name("Den"))
///         .await?;
///     manager.connect(&id).await?;
///
///     let status = manager.execute(&id, &MediaPlayerCommand::new("ON")).await;
///     println!("{status}");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct DeviceManager {
    devices: Arc<RwLock<HashMap<DeviceId, ManagedDevice>>>,
    event_bus: EventBus,
    policy: ConnectionPolicy,
}

impl DeviceManager {
    /// Creates a manager with the default connection policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            event_bus: EventBus::new(),
            policy: ConnectionPolicy::default(),
        }
    }

    /// Creates a manager with a custom event bus capacity.
    #[must_use]
    pub fn with_capacity(event_capacity: usize) -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            event_bus: EventBus::with_capacity(event_capacity),
            policy: ConnectionPolicy::default(),
        }
    }

    /// Sets the policy used for receivers added afterwards.
    #[must_use]
    pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the policy applied to new receivers.
    #[must_use]
    pub fn policy(&self) -> &ConnectionPolicy {
        &self.policy
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Subscribes to events from all managed receivers.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.event_bus.subscribe()
    }

    /// Returns the number of active event subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.event_bus.subscriber_count()
    }

    // =========================================================================
    // Device Management
    // =========================================================================

    /// Adds a receiver that dials the address in `config`.
    ///
    /// The receiver is not connected automatically. A receiver with the
    /// same identifier is shut down and replaced.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub async fn add_device(&self, config: DeviceConfig) -> Result<DeviceId> {
        let device = ReceiverDevice::new(config, self.policy.clone())?;
        Ok(self.insert(device).await)
    }

    /// Adds a receiver whose transport is opened through `connector`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub async fn add_device_with_connector(
        &self,
        config: DeviceConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<DeviceId> {
        let device = ReceiverDevice::with_connector(config, connector, self.policy.clone())?;
        Ok(self.insert(device).await)
    }

    async fn insert(&self, device: ReceiverDevice) -> DeviceId {
        let device = device.with_event_bus(self.event_bus.clone());
        let managed = ManagedDevice::new(device, &self.policy);
        let device_id = managed.id().clone();

        let previous = self
            .devices
            .write()
            .await
            .insert(device_id.clone(), managed);
        if let Some(previous) = previous {
            tracing::info!(device = %device_id, "replacing existing receiver");
            previous.shutdown().await;
        }

        tracing::info!(device = %device_id, "receiver added");
        self.event_bus
            .publish(DeviceEvent::device_added(device_id.clone()));
        device_id
    }

    /// Removes a receiver, stopping its watchdog and closing its transport.
    ///
    /// # Returns
    ///
    /// Returns `true` if the receiver was found and removed.
    pub async fn remove_device(&self, device_id: &DeviceId) -> bool {
        let removed = self.devices.write().await.remove(device_id);

        match removed {
            Some(managed) => {
                managed.shutdown().await;
                tracing::info!(device = %device_id, "receiver removed");
                self.event_bus
                    .publish(DeviceEvent::device_removed(device_id.clone()));
                true
            }
            None => false,
        }
    }

    /// Returns the identifiers of all managed receivers.
    pub async fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.read().await.keys().cloned().collect()
    }

    /// Returns the number of managed receivers.
    pub async fn device_count(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Returns `true` if a receiver with `device_id` is managed.
    pub async fn contains(&self, device_id: &DeviceId) -> bool {
        self.devices.read().await.contains_key(device_id)
    }

    /// Returns a shared handle to a receiver.
    ///
    /// Holding the lock blocks commands and the watchdog for that receiver.
    pub async fn device(&self, device_id: &DeviceId) -> Option<Arc<Mutex<ReceiverDevice>>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(ManagedDevice::device)
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Connects a receiver.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown identifier, or the
    /// error that prevented the transport from opening.
    pub async fn connect(&self, device_id: &DeviceId) -> Result<()> {
        let device = self.device(device_id).await.ok_or(Error::DeviceNotFound)?;
        device.lock().await.try_connect().await
    }

    /// Disconnects a receiver.
    ///
    /// The watchdog keeps running and will reconnect on its next check.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` for an unknown identifier.
    pub async fn disconnect(&self, device_id: &DeviceId) -> Result<()> {
        let device = self.device(device_id).await.ok_or(Error::DeviceNotFound)?;
        device.lock().await.disconnect().await;
        Ok(())
    }

    /// Returns `true` if the receiver is known and connected.
    pub async fn is_connected(&self, device_id: &DeviceId) -> bool {
        self.devices
            .read()
            .await
            .get(device_id)
            .is_some_and(|managed| managed.state().connection().is_connected())
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Returns the last published state of a receiver.
    pub async fn get_state(&self, device_id: &DeviceId) -> Option<DeviceState> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(ManagedDevice::state)
    }

    /// Returns a watch receiver for a receiver's state.
    pub async fn watch_device(&self, device_id: &DeviceId) -> Option<watch::Receiver<DeviceState>> {
        self.devices
            .read()
            .await
            .get(device_id)
            .map(ManagedDevice::watch_state)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Runs a media player command against a receiver.
    ///
    /// An unknown identifier yields [`StatusCode::BadRequest`].
    pub async fn execute(&self, device_id: &DeviceId, command: &MediaPlayerCommand) -> StatusCode {
        let Some(device) = self.device(device_id).await else {
            tracing::warn!(device = %device_id, command = %command.cmd_id, "unknown receiver");
            return StatusCode::BadRequest;
        };
        let mut device = device.lock().await;
        handle_command(&mut device, command).await
    }

    /// Adds every receiver in `store`, optionally connecting each one.
    ///
    /// Connection failures are logged and left to the watchdog.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a stored configuration is invalid.
    pub async fn load_from(&self, store: &ConfigStore, connect: bool) -> Result<Vec<DeviceId>> {
        let mut ids = Vec::with_capacity(store.len());
        for config in store.all() {
            let id = self.add_device(config.clone()).await?;
            if connect && let Err(e) = self.connect(&id).await {
                tracing::warn!(device = %id, error = %e, "initial connect failed");
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DeviceManager {
    fn clone(&self) -> Self {
        Self {
            devices: Arc::clone(&self.devices),
            event_bus: self.event_bus.clone(),
            policy: self.policy.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::dispatch::CommandId;
    use crate::protocol::{ReceiverProtocol, ReceiverStatus};
    use crate::types::{SourceSelector, StepDirection, Volume};

    /// A receiver that is always on and remembers its volume.
    #[derive(Default)]
    struct Loopback {
        volume: Option<Volume>,
    }

    #[async_trait]
    impl ReceiverProtocol for Loopback {
        async fn source_list(&mut self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn fetch_status(&mut self) -> Result<ReceiverStatus> {
            Ok(ReceiverStatus {
                power: true,
                muted: Some(false),
                volume: Some(self.volume.unwrap_or_default()),
                source: None,
            })
        }
        async fn set_power(&mut self, _on: bool) -> Result<()> {
            Ok(())
        }
        async fn set_volume(&mut self, volume: Volume) -> Result<()> {
            self.volume = Some(volume);
            Ok(())
        }
        async fn step_volume(&mut self, _d: StepDirection, _c: Volume) -> Result<()> {
            Ok(())
        }
        async fn set_mute(&mut self, _muted: bool) -> Result<()> {
            Ok(())
        }
        async fn select_source(&mut self, _source: &SourceSelector) -> Result<()> {
            Ok(())
        }
        async fn ping(&mut self) -> Result<()> {
            Ok(())
        }
        async fn close(&mut self) {}
    }

    #[derive(Default)]
    struct LoopbackConnector {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl Connector for LoopbackConnector {
        async fn connect(&self) -> Result<Box<dyn ReceiverProtocol>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(Loopback::default()))
        }
    }

    fn manager() -> DeviceManager {
        DeviceManager::new().with_policy(ConnectionPolicy::immediate().without_watchdog())
    }

    #[tokio::test]
    async fn new_manager_is_empty() {
        let manager = DeviceManager::new();

        assert_eq!(manager.device_count().await, 0);
        assert!(manager.device_ids().await.is_empty());
    }

    #[tokio::test]
    async fn add_device_returns_identifier() {
        let manager = manager();

        let id = manager.add_device(DeviceConfig::tcp("10.0.0.2")).await.unwrap();

        assert_eq!(id.as_str(), "10.0.0.2_53");
        assert!(manager.contains(&id).await);
        assert_eq!(manager.device_count().await, 1);
    }

    #[tokio::test]
    async fn add_invalid_device_fails() {
        let manager = manager();
        let result = manager.add_device(DeviceConfig::tcp("")).await;

        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(manager.device_count().await, 0);
    }

    #[tokio::test]
    async fn adding_same_identifier_replaces() {
        let manager = manager();
        manager
            .add_device(DeviceConfig::tcp("10.0.0.2").with_name("Den"))
            .await
            .unwrap();
        let id = manager
            .add_device(DeviceConfig::tcp("10.0.0.2").with_name("Study"))
            .await
            .unwrap();

        assert_eq!(manager.device_count().await, 1);
        let device = manager.device(&id).await.unwrap();
        assert_eq!(device.lock().await.name(), "Study");
    }

    #[tokio::test]
    async fn add_and_remove_publish_events() {
        let manager = manager();
        let mut events = manager.subscribe();

        let id = manager.add_device(DeviceConfig::tcp("10.0.0.2")).await.unwrap();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, DeviceEvent::DeviceAdded { ref device_id } if *device_id == id));

        assert!(manager.remove_device(&id).await);
        let event = events.recv().await.unwrap();
        assert!(matches!(event, DeviceEvent::DeviceRemoved { ref device_id } if *device_id == id));
        assert_eq!(manager.device_count().await, 0);
    }

    #[tokio::test]
    async fn remove_unknown_device_returns_false() {
        assert!(!manager().remove_device(&DeviceId::new("ghost")).await);
    }

    #[tokio::test]
    async fn unknown_device_lookups() {
        let manager = manager();
        let ghost = DeviceId::new("ghost");

        assert!(manager.get_state(&ghost).await.is_none());
        assert!(manager.watch_device(&ghost).await.is_none());
        assert!(!manager.is_connected(&ghost).await);
        assert!(matches!(
            manager.connect(&ghost).await,
            Err(Error::DeviceNotFound)
        ));
        assert!(matches!(
            manager.disconnect(&ghost).await,
            Err(Error::DeviceNotFound)
        ));
    }

    #[tokio::test]
    async fn execute_on_unknown_device_is_bad_request() {
        let status = manager()
            .execute(&DeviceId::new("ghost"), &MediaPlayerCommand::new(CommandId::On))
            .await;
        assert_eq!(status, StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn connect_and_execute_through_connector() {
        let manager = manager();
        let connector = Arc::new(LoopbackConnector::default());
        let id = manager
            .add_device_with_connector(DeviceConfig::tcp("10.0.0.2"), connector.clone())
            .await
            .unwrap();
        let mut events = manager.subscribe();

        manager.connect(&id).await.unwrap();
        assert!(manager.is_connected(&id).await);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);

        let connected = events.recv().await.unwrap();
        assert!(matches!(
            connected,
            DeviceEvent::ConnectionChanged { connected: true, .. }
        ));

        let command = MediaPlayerCommand::new(CommandId::Volume).with_param("volume", 40);
        assert_eq!(manager.execute(&id, &command).await, StatusCode::Ok);

        let state = manager.get_state(&id).await.unwrap();
        assert!(state.power());
        assert_eq!(state.volume().value(), 40);
    }

    #[tokio::test]
    async fn watch_device_sees_updates() {
        let manager = manager();
        let id = manager
            .add_device_with_connector(
                DeviceConfig::tcp("10.0.0.2"),
                Arc::new(LoopbackConnector::default()),
            )
            .await
            .unwrap();
        let mut rx = manager.watch_device(&id).await.unwrap();

        manager.connect(&id).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().connection().is_connected());
    }

    #[tokio::test]
    async fn load_from_store_adds_every_device() {
        let path = std::env::temp_dir()
            .join(format!("nadav-manager-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let mut store = ConfigStore::open(&path).unwrap();
        store.upsert(DeviceConfig::tcp("10.0.0.2")).unwrap();
        store.upsert(DeviceConfig::telnet("10.0.0.3", 23)).unwrap();

        let manager = manager();
        let ids = manager.load_from(&store, false).await.unwrap();

        assert_eq!(ids.len(), 2);
        assert!(manager.contains(&DeviceId::new("10.0.0.3_23")).await);
        assert!(!manager.is_connected(&ids[0]).await);

        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn clones_share_devices() {
        let manager = manager();
        let other = manager.clone();

        manager.add_device(DeviceConfig::tcp("10.0.0.2")).await.unwrap();

        assert_eq!(other.device_count().await, 1);
    }
}
