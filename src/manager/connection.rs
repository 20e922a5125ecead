// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport lifecycle for one receiver.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::event::DeviceId;
use crate::protocol::{Connector, ReceiverProtocol};
use crate::state::ConnectionStatus;

use super::device_config::ConnectionPolicy;

/// Owns the open adapter of one receiver and knows how to replace it.
///
/// The manager never talks to the receiver itself; it hands out the adapter
/// through [`protocol_mut`](Self::protocol_mut) and swaps it on reconnect.
pub struct ConnectionManager {
    device_id: DeviceId,
    connector: Arc<dyn Connector>,
    policy: ConnectionPolicy,
    protocol: Option<Box<dyn ReceiverProtocol>>,
    status: ConnectionStatus,
}

impl ConnectionManager {
    /// Creates a disconnected manager.
    #[must_use]
    pub fn new(device_id: DeviceId, connector: Arc<dyn Connector>, policy: ConnectionPolicy) -> Self {
        Self {
            device_id,
            connector,
            policy,
            protocol: None,
            status: ConnectionStatus::Disconnected,
        }
    }

    /// Returns the connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Returns `true` if an adapter is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.is_connected() && self.protocol.is_some()
    }

    /// Returns the timing and retry policy.
    #[must_use]
    pub fn policy(&self) -> &ConnectionPolicy {
        &self.policy
    }

    /// Opens the transport. Does nothing if already connected.
    ///
    /// # Errors
    ///
    /// Returns the connector's error; the status is left `Disconnected`.
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        self.status = ConnectionStatus::Connecting;
        match self.connector.connect().await {
            Ok(protocol) => {
                self.protocol = Some(protocol);
                self.status = ConnectionStatus::Connected;
                tracing::info!(device = %self.device_id, "connected");
                Ok(())
            }
            Err(e) => {
                self.status = ConnectionStatus::Disconnected;
                tracing::warn!(device = %self.device_id, error = %e, "connection failed");
                Err(e)
            }
        }
    }

    /// Closes the transport. Safe to call when already disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(mut protocol) = self.protocol.take() {
            protocol.close().await;
            tracing::info!(device = %self.device_id, "disconnected");
        }
        self.status = ConnectionStatus::Disconnected;
    }

    /// Connects if needed, then waits for the receiver to settle.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` if the transport cannot be opened.
    pub async fn ensure_connected(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        tracing::warn!(device = %self.device_id, "not connected, connecting");
        self.connect().await.map_err(|e| {
            tracing::error!(device = %self.device_id, error = %e, "could not connect");
            Error::NotConnected
        })?;
        tokio::time::sleep(self.policy.reconnect_settle).await;
        Ok(())
    }

    /// Closes and reopens the transport.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if reopening fails.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.disconnect().await;
        tokio::time::sleep(self.policy.reconnect_pause).await;
        self.connect().await?;
        tokio::time::sleep(self.policy.reconnect_settle).await;
        Ok(())
    }

    /// Returns the open adapter.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotConnected` if no adapter is open.
    pub fn protocol_mut(&mut self) -> Result<&mut (dyn ReceiverProtocol + 'static)> {
        self.protocol.as_deref_mut().ok_or(Error::NotConnected)
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("device_id", &self.device_id)
            .field("status", &self.status)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::TransportError;
    use crate::protocol::ReceiverStatus;
    use crate::types::{SourceSelector, StepDirection, Volume};

    struct Idle;

    #[async_trait]
    impl ReceiverProtocol for Idle {
        async fn source_list(&mut self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn fetch_status(&mut self) -> Result<ReceiverStatus> {
            Ok(ReceiverStatus::default())
        }
        async fn set_power(&mut self, _on: bool) -> Result<()> {
            Ok(())
        }
        async fn set_volume(&mut self, _volume: Volume) -> Result<()> {
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

    /// Fails the first `failures` connects.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Connector for Flaky {
        async fn connect(&self) -> Result<Box<dyn ReceiverProtocol>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(TransportError::Closed.into())
            } else {
                Ok(Box::new(Idle))
            }
        }
    }

    fn manager(failures: usize) -> (ConnectionManager, Arc<Flaky>) {
        let connector = Arc::new(Flaky {
            failures,
            calls: AtomicUsize::new(0),
        });
        let manager = ConnectionManager::new(
            DeviceId::new("amp"),
            connector.clone(),
            ConnectionPolicy::immediate(),
        );
        (manager, connector)
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let (mut manager, connector) = manager(0);

        manager.connect().await.unwrap();
        manager.connect().await.unwrap();

        assert!(manager.is_connected());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_connect_leaves_disconnected() {
        let (mut manager, _) = manager(1);

        assert!(manager.connect().await.is_err());
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert!(matches!(manager.protocol_mut(), Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn ensure_connected_maps_failure() {
        let (mut manager, _) = manager(1);

        let err = manager.ensure_connected().await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));

        manager.ensure_connected().await.unwrap();
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn disconnect_twice_is_harmless() {
        let (mut manager, _) = manager(0);
        manager.connect().await.unwrap();

        manager.disconnect().await;
        manager.disconnect().await;

        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_opens_a_new_adapter() {
        let (mut manager, connector) = manager(0);
        manager.connect().await.unwrap();

        manager.reconnect().await.unwrap();

        assert!(manager.is_connected());
        assert_eq!(connector.calls.load(Ordering::SeqCst), 2);
    }
}
