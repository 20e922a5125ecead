// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Opening transports and choosing the dialect.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::error::{ConfigError, Result};
use crate::manager::{ConnectionType, DeviceConfig};
use crate::types::VolumeRange;

use super::{PacketizedAdapter, QueryResponseAdapter, ReceiverProtocol, TCP_PORT, timed};

/// Baud rate of the RS-232 port (8N1, no flow control).
pub const SERIAL_BAUD_RATE: u32 = 115_200;

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a fresh protocol adapter for one receiver.
///
/// The connection manager calls this on every connect and reconnect.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens the transport and wraps it in the matching adapter.
    async fn connect(&self) -> Result<Box<dyn ReceiverProtocol>>;
}

/// Connector that dials the address in a [`DeviceConfig`].
///
/// # Examples
///
/// ```no_run
/// use nadav_lib::manager::DeviceConfig;
/// use nadav_lib::protocol::{Connector, DialConnector};
///
/// # async fn example() -> nadav_lib::Result<()> {
/// let connector = DialConnector::new(DeviceConfig::telnet("192.168.1.41", 23));
/// let mut protocol = connector.connect().await?;
/// let status = protocol.fetch_status().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DialConnector {
    config: DeviceConfig,
    io_timeout: Duration,
}

impl DialConnector {
    /// Creates a connector for `config`.
    #[must_use]
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Sets the bound on connecting and on each round trip.
    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Returns the configuration this connector dials.
    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    async fn dial(&self, port: u16) -> Result<TcpStream> {
        let host = self
            .config
            .host
            .as_deref()
            .ok_or(ConfigError::MissingHost(self.config.connection_type.as_str()))?;
        let stream = timed(self.io_timeout, TcpStream::connect((host, port))).await?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not disable Nagle");
        }
        Ok(stream)
    }

    #[cfg(feature = "serial")]
    fn open_serial(&self, range: VolumeRange) -> Result<Box<dyn ReceiverProtocol>> {
        use tokio_serial::SerialPortBuilderExt;

        let port = tokio_serial::new(self.config.serial_port.as_str(), SERIAL_BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(crate::error::TransportError::from)?;

        Ok(Box::new(
            QueryResponseAdapter::new(port, range, self.config.source_map())
                .with_io_timeout(self.io_timeout),
        ))
    }

    #[cfg(not(feature = "serial"))]
    #[allow(clippy::unused_self)]
    fn open_serial(&self, _range: VolumeRange) -> Result<Box<dyn ReceiverProtocol>> {
        Err(ConfigError::SerialUnsupported.into())
    }
}

#[async_trait]
impl Connector for DialConnector {
    async fn connect(&self) -> Result<Box<dyn ReceiverProtocol>> {
        let range = self.config.volume_range()?;
        tracing::debug!(
            device = %self.config.identifier,
            kind = %self.config.connection_type,
            address = %self.config.address(),
            "opening transport"
        );

        match self.config.connection_type {
            ConnectionType::Tcp => {
                let stream = self.dial(TCP_PORT).await?;
                Ok(Box::new(
                    PacketizedAdapter::new(stream, range, self.config.volume_step)
                        .with_io_timeout(self.io_timeout),
                ))
            }
            ConnectionType::Telnet => {
                let stream = self.dial(self.config.port).await?;
                Ok(Box::new(
                    QueryResponseAdapter::new(stream, range, self.config.source_map())
                        .with_io_timeout(self.io_timeout),
                ))
            }
            ConnectionType::Rs232 => self.open_serial(range),
        }
    }
}

/// Checks that a receiver answers before its configuration is saved.
///
/// Opens the transport, performs one status round trip (TCP) or one power
/// query (Telnet, RS-232), then closes it again.
///
/// # Errors
///
/// Returns the validation, transport or protocol error that stopped the probe.
pub async fn probe(config: &DeviceConfig) -> Result<()> {
    config.validate()?;

    let mut protocol = DialConnector::new(config.clone()).connect().await?;
    let result = protocol.ping().await;
    protocol.close().await;

    match &result {
        Ok(()) => tracing::info!(device = %config.identifier, "receiver answered probe"),
        Err(e) => tracing::warn!(device = %config.identifier, error = %e, "probe failed"),
    }
    result
}
