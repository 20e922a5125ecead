// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State machine for one receiver.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::event::{DeviceEvent, DeviceId, EventBus};
use crate::protocol::{Connector, DialConnector, ReceiverProtocol, ReceiverStatus};
use crate::state::{ConnectionStatus, DeviceState};
use crate::types::{SourceSelector, StepDirection, Volume};

use super::connection::ConnectionManager;
use super::device_config::{ConnectionPolicy, DeviceConfig};

/// A state-changing request sent to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Power(bool),
    Volume(Volume),
    Step(StepDirection),
    Mute(bool),
    Source {
        selector: SourceSelector,
        name: String,
    },
}

impl Action {
    /// Sends the request; `current` is the last known volume, used by steps.
    async fn apply(&self, protocol: &mut dyn ReceiverProtocol, current: Volume) -> Result<()> {
        match self {
            Self::Power(on) => protocol.set_power(*on).await,
            Self::Volume(volume) => protocol.set_volume(*volume).await,
            Self::Step(direction) => protocol.step_volume(*direction, current).await,
            Self::Mute(muted) => protocol.set_mute(*muted).await,
            Self::Source { selector, .. } => protocol.select_source(selector).await,
        }
    }

    /// Writes the expected outcome before the receiver confirms it.
    fn apply_optimistic(&self, state: &mut DeviceState) {
        match self {
            Self::Power(on) => state.set_power(*on),
            Self::Volume(volume) => state.set_volume(*volume),
            Self::Step(_) => {}
            Self::Mute(muted) => state.set_muted(*muted),
            Self::Source { name, .. } => state.set_source(Some(name.clone())),
        }
    }

    fn settle(&self, policy: &ConnectionPolicy) -> Duration {
        match self {
            Self::Power(_) => policy.power_settle,
            Self::Volume(_) | Self::Step(_) => policy.volume_settle,
            Self::Mute(_) => policy.mute_settle,
            Self::Source { .. } => policy.source_settle,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Power(on) => write!(f, "power {}", if *on { "on" } else { "off" }),
            Self::Volume(volume) => write!(f, "volume {volume}"),
            Self::Step(StepDirection::Up) => f.write_str("volume up"),
            Self::Step(StepDirection::Down) => f.write_str("volume down"),
            Self::Mute(muted) => write!(f, "mute {}", if *muted { "on" } else { "off" }),
            Self::Source { name, .. } => write!(f, "source {name}"),
        }
    }
}

/// One configured receiver: its connection, its last known state and the
/// commands it accepts.
///
/// Every command follows the same sequence: make sure a transport is open,
/// send, record the expected outcome, wait for the receiver to settle, then
/// read the real state back. Transport failures are retried once over a
/// fresh connection.
///
/// Commands take `&mut self`, so one device never has two commands in
/// flight. The boolean methods log failures and report success; the
/// `try_*` methods return the error instead.
///
/// # Examples
///
/// ```no_run
/// use nadav_lib::manager::{ConnectionPolicy, DeviceConfig, ReceiverDevice};
/// use nadav_lib::types::Volume;
///
/// # async fn example() -> nadav_lib::Result<()> {
/// let config = DeviceConfig::tcp("192.168.1.40").with_name("Living Room");
/// let mut receiver = ReceiverDevice::new(config, ConnectionPolicy::default())?;
///
/// if receiver.connect().await {
///     receiver.turn_on().await;
///     receiver.set_volume(Volume::new(35)?).await;
///     receiver.select_source("Bluetooth").await;
/// }
/// println!("{:?}", receiver.state());
/// # Ok(())
/// # }
/// ```
pub struct ReceiverDevice {
    config: DeviceConfig,
    state: DeviceState,
    connection: ConnectionManager,
    state_tx: watch::Sender<DeviceState>,
    events: EventBus,
}

impl ReceiverDevice {
    /// Creates a receiver that dials the address in `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn new(config: DeviceConfig, policy: ConnectionPolicy) -> Result<Self> {
        let connector = DialConnector::new(config.clone()).with_io_timeout(policy.io_timeout);
        Self::with_connector(config, Arc::new(connector), policy)
    }

    /// Creates a receiver that opens its transport through `connector`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn with_connector(
        config: DeviceConfig,
        connector: Arc<dyn Connector>,
        policy: ConnectionPolicy,
    ) -> Result<Self> {
        config.validate()?;

        let mut state = DeviceState::new();
        if config.connection_type.uses_line_protocol() {
            state.set_source_list(config.source_map().names());
        }
        let (state_tx, _) = watch::channel(state.clone());

        Ok(Self {
            connection: ConnectionManager::new(config.identifier.clone(), connector, policy),
            config,
            state,
            state_tx,
            events: EventBus::new(),
        })
    }

    /// Publishes connection and state events on `events` instead of a private bus.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Returns the device identifier.
    #[must_use]
    pub fn id(&self) -> &DeviceId {
        &self.config.identifier
    }

    /// Returns the configured name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Returns the last known state.
    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Subscribes to state snapshots.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<DeviceState> {
        self.state_tx.subscribe()
    }

    /// Subscribes to this device's events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Returns `true` if a transport is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Returns the connection status.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    // ========== Connection ==========

    /// Opens the transport, loads the source list and refreshes the state.
    pub async fn connect(&mut self) -> bool {
        let result = self.try_connect().await;
        self.report("connect", result)
    }

    /// Like [`connect`](Self::connect), returning the error.
    ///
    /// A failed initial refresh is logged but does not fail the connect as
    /// long as the transport stays open.
    ///
    /// # Errors
    ///
    /// Returns the error that prevented the transport from opening.
    pub async fn try_connect(&mut self) -> Result<()> {
        if self.connection.is_connected() {
            return Ok(());
        }

        self.set_connection(ConnectionStatus::Connecting, None);
        let opened = self.connection.connect().await;
        self.finish_connect(opened).await
    }

    /// Checks that the receiver still answers on the open transport.
    ///
    /// A transport failure drops the connection so the next command or
    /// watchdog tick reconnects.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` if no transport is open, or the error
    /// the round trip failed with.
    pub async fn try_ping(&mut self) -> Result<()> {
        let result = self.connection.protocol_mut()?.ping().await;
        if let Err(e) = &result
            && e.is_retryable()
        {
            tracing::warn!(device = %self.id(), error = %e, "receiver stopped answering");
            self.connection.disconnect().await;
            self.set_connection(ConnectionStatus::Disconnected, Some(e));
        }
        result
    }

    /// Closes the transport. Safe to call when already disconnected.
    pub async fn disconnect(&mut self) {
        self.connection.disconnect().await;
        self.set_connection(ConnectionStatus::Disconnected, None);
    }

    /// Connects before a command, with the same source load and refresh as
    /// [`try_connect`](Self::try_connect).
    async fn ensure_connected(&mut self) -> Result<()> {
        if self.connection.is_connected() {
            return Ok(());
        }
        self.set_connection(ConnectionStatus::Connecting, None);
        let opened = self.connection.ensure_connected().await;
        self.finish_connect(opened).await
    }

    async fn finish_connect(&mut self, opened: Result<()>) -> Result<()> {
        if let Err(e) = opened {
            self.set_connection(ConnectionStatus::Disconnected, Some(&e));
            return Err(e);
        }
        self.set_connection(ConnectionStatus::Connected, None);
        self.load_source_list().await;

        if let Err(e) = self.refresh_state().await {
            tracing::warn!(device = %self.id(), error = %e, "initial refresh failed");
            if !self.connection.is_connected() {
                return Err(e);
            }
        }
        Ok(())
    }

    async fn load_source_list(&mut self) {
        let Ok(protocol) = self.connection.protocol_mut() else {
            return;
        };
        match protocol.source_list().await {
            Ok(sources) => self.state.set_source_list(sources),
            Err(e) => {
                tracing::warn!(device = %self.id(), error = %e, "could not read source list");
                self.state.set_source_list(Vec::new());
            }
        }
        self.publish_state();
    }

    // ========== Commands ==========

    /// Switches the receiver on.
    pub async fn turn_on(&mut self) -> bool {
        let result = self.try_turn_on().await;
        self.report("turn on", result)
    }

    /// Switches the receiver to standby.
    pub async fn turn_off(&mut self) -> bool {
        let result = self.try_turn_off().await;
        self.report("turn off", result)
    }

    /// Sets an absolute volume.
    pub async fn set_volume(&mut self, volume: Volume) -> bool {
        let result = self.try_set_volume(volume).await;
        self.report("set volume", result)
    }

    /// Raises the volume one step.
    pub async fn volume_up(&mut self) -> bool {
        let result = self.try_volume_up().await;
        self.report("volume up", result)
    }

    /// Lowers the volume one step.
    pub async fn volume_down(&mut self) -> bool {
        let result = self.try_volume_down().await;
        self.report("volume down", result)
    }

    /// Mutes or unmutes.
    pub async fn mute(&mut self, muted: bool) -> bool {
        let result = self.try_mute(muted).await;
        self.report("mute", result)
    }

    /// Selects an input source by name.
    pub async fn select_source(&mut self, name: &str) -> bool {
        let result = self.try_select_source(name).await;
        self.report("select source", result)
    }

    /// Reads the current state from the receiver.
    pub async fn refresh(&mut self) -> bool {
        let result = self.try_refresh().await;
        self.report("refresh", result)
    }

    /// # Errors
    ///
    /// Returns the error that made the command fail.
    pub async fn try_turn_on(&mut self) -> Result<()> {
        self.run_command(Action::Power(true)).await
    }

    /// # Errors
    ///
    /// Returns the error that made the command fail.
    pub async fn try_turn_off(&mut self) -> Result<()> {
        self.run_command(Action::Power(false)).await
    }

    /// # Errors
    ///
    /// Returns the error that made the command fail.
    pub async fn try_set_volume(&mut self, volume: Volume) -> Result<()> {
        self.run_command(Action::Volume(volume)).await
    }

    /// Steps from the last known volume.
    ///
    /// # Errors
    ///
    /// Returns the error that made the command fail.
    pub async fn try_volume_up(&mut self) -> Result<()> {
        self.run_command(Action::Step(StepDirection::Up)).await
    }

    /// Steps from the last known volume.
    ///
    /// # Errors
    ///
    /// Returns the error that made the command fail.
    pub async fn try_volume_down(&mut self) -> Result<()> {
        self.run_command(Action::Step(StepDirection::Down)).await
    }

    /// # Errors
    ///
    /// Returns the error that made the command fail.
    pub async fn try_mute(&mut self, muted: bool) -> Result<()> {
        self.run_command(Action::Mute(muted)).await
    }

    /// Resolves `name` before any I/O.
    ///
    /// # Errors
    ///
    /// Returns `Error::SourceNotFound` if the name has no code, or the error
    /// that made the command fail.
    pub async fn try_select_source(&mut self, name: &str) -> Result<()> {
        let selector = self.config.source_selector(name).inspect_err(|_| {
            tracing::warn!(device = %self.id(), source = name, "source not found");
        })?;
        self.run_command(Action::Source {
            selector,
            name: name.to_string(),
        })
        .await
    }

    /// # Errors
    ///
    /// Returns the error that prevented the refresh.
    pub async fn try_refresh(&mut self) -> Result<()> {
        if !self.connection.is_connected() {
            self.ensure_connected().await?;
        }
        self.refresh_state().await
    }

    async fn run_command(&mut self, action: Action) -> Result<()> {
        self.ensure_connected().await?;

        let label = action.to_string();
        tracing::info!(device = %self.id(), command = %label, "sending command");

        let snapshot = self.state.clone();
        self.execute(&action, &label, snapshot.volume()).await?;
        action.apply_optimistic(&mut self.state);
        self.publish_state();

        tokio::time::sleep(action.settle(self.connection.policy())).await;

        if let Err(e) = self.refresh_state().await {
            tracing::warn!(
                device = %self.id(),
                command = %label,
                error = %e,
                "could not confirm state, reverting"
            );
            self.state.revert_to(&snapshot);
            self.publish_state();
        }
        Ok(())
    }

    // ========== Retry ==========

    async fn execute(&mut self, action: &Action, label: &str, current: Volume) -> Result<()> {
        let attempts = self.connection.policy().command_attempts.max(1);
        let mut attempt = 1;
        loop {
            let error = match self.connection.protocol_mut() {
                Ok(protocol) => match action.apply(protocol, current).await {
                    Ok(()) => return Ok(()),
                    Err(e) => e,
                },
                Err(e) => e,
            };
            self.recover(label, attempt, attempts, error).await?;
            attempt += 1;
        }
    }

    async fn fetch_status(&mut self) -> Result<ReceiverStatus> {
        let attempts = self.connection.policy().command_attempts.max(1);
        let mut attempt = 1;
        loop {
            let error = match self.connection.protocol_mut() {
                Ok(protocol) => match protocol.fetch_status().await {
                    Ok(status) => return Ok(status),
                    Err(e) => e,
                },
                Err(e) => e,
            };
            self.recover("status refresh", attempt, attempts, error)
                .await?;
            attempt += 1;
        }
    }

    /// Decides whether a failed attempt is retried.
    ///
    /// Returns `Ok` after a reconnect when another attempt should follow,
    /// or the error when the call has failed for good.
    async fn recover(&mut self, what: &str, attempt: u32, attempts: u32, error: Error) -> Result<()> {
        if !error.is_retryable() {
            tracing::error!(device = %self.id(), error = %error, "{what} failed");
            return Err(error);
        }
        if attempt >= attempts {
            tracing::error!(
                device = %self.id(),
                attempts,
                error = %error,
                "{what} failed, giving up"
            );
            self.connection.disconnect().await;
            self.set_connection(ConnectionStatus::Disconnected, Some(&error));
            return Err(error);
        }

        tracing::warn!(
            device = %self.id(),
            attempt,
            attempts,
            error = %error,
            "{what} failed, reconnecting"
        );
        tokio::time::sleep(self.connection.policy().retry_delay).await;
        match self.connection.reconnect().await {
            Ok(()) => self.set_connection(ConnectionStatus::Connected, None),
            Err(e) => {
                tracing::warn!(device = %self.id(), error = %e, "reconnect failed");
                self.set_connection(ConnectionStatus::Disconnected, Some(&e));
            }
        }
        Ok(())
    }

    // ========== State ==========

    async fn refresh_state(&mut self) -> Result<()> {
        let status = self.fetch_status().await?;
        self.state.apply_status(&status);
        self.publish_state();

        let update = self.state.to_update();
        tracing::debug!(device = %self.id(), ?update, "state refreshed");
        self.events
            .publish(DeviceEvent::state_changed(self.id().clone(), update));
        Ok(())
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn set_connection(&mut self, status: ConnectionStatus, error: Option<&Error>) {
        if self.state.connection() == status {
            return;
        }
        self.state.set_connection(status);
        self.publish_state();

        let id = self.id().clone();
        match (status, error) {
            (ConnectionStatus::Connected, _) => self.events.publish(DeviceEvent::connected(id)),
            (ConnectionStatus::Disconnected, Some(e)) => self
                .events
                .publish(DeviceEvent::disconnected_with_error(id, e.to_string())),
            (ConnectionStatus::Disconnected, None) => {
                self.events.publish(DeviceEvent::disconnected(id));
            }
            (ConnectionStatus::Connecting, _) => {}
        }
    }

    fn report(&self, what: &str, result: Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(device = %self.id(), error = %e, "{what} failed");
                false
            }
        }
    }
}

impl fmt::Debug for ReceiverDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverDevice")
            .field("id", self.id())
            .field("name", &self.config.name)
            .field("connection", &self.connection)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
