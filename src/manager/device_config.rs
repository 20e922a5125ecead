// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device configuration types for the device manager.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Error, ValueError};
use crate::event::DeviceId;
use crate::types::{SourceMap, SourceSelector, VolumeRange};

/// Default Telnet port stored for network receivers.
pub const DEFAULT_PORT: u16 = 53;
/// Default serial device path.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
/// Default volume floor in dB.
pub const DEFAULT_MIN_VOLUME: i32 = -92;
/// Default volume ceiling in dB.
pub const DEFAULT_MAX_VOLUME: i32 = -20;
/// Default volume step in dB.
pub const DEFAULT_VOLUME_STEP: i32 = 4;
/// Lowest volume limit accepted in a configuration, in dB.
pub const VOLUME_LIMIT_FLOOR: i32 = -99;
/// Highest volume limit accepted in a configuration, in dB.
pub const VOLUME_LIMIT_CEILING: i32 = 30;
/// Largest volume step accepted in a configuration, in dB.
pub const MAX_VOLUME_STEP: i32 = 20;

/// How the receiver is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    /// Binary frames on TCP port 50001.
    #[serde(rename = "TCP")]
    Tcp,
    /// Line protocol over a Telnet session.
    #[serde(rename = "Telnet")]
    Telnet,
    /// Line protocol over an RS-232 serial link.
    #[serde(rename = "RS232")]
    Rs232,
}

impl ConnectionType {
    /// Returns the configuration name of this connection type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Telnet => "Telnet",
            Self::Rs232 => "RS232",
        }
    }

    /// Returns `true` for the line-protocol connection types.
    #[must_use]
    pub const fn uses_line_protocol(self) -> bool {
        matches!(self, Self::Telnet | Self::Rs232)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of one receiver, as persisted between runs.
///
/// # Examples
///
/// ```
/// use nadav_lib::manager::{ConnectionType, DeviceConfig};
/// use nadav_lib::types::SourceMap;
///
/// let config = DeviceConfig::tcp("192.168.1.40").with_name("Living Room");
/// assert_eq!(config.identifier.as_str(), "192.168.1.40_53");
///
/// let sources: SourceMap = [(1, "CD"), (2, "Tuner")].into_iter().collect();
/// let config = DeviceConfig::serial("/dev/ttyUSB0")
///     .with_volume_limits(-80, -10)
///     .with_sources(sources);
/// assert_eq!(config.connection_type, ConnectionType::Rs232);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable identifier derived from the address.
    pub identifier: DeviceId,
    /// User-facing name.
    pub name: String,
    /// Transport and dialect.
    pub connection_type: ConnectionType,
    /// Host for TCP and Telnet receivers.
    #[serde(default)]
    pub host: Option<String>,
    /// Telnet port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Serial device path for RS-232 receivers.
    #[serde(default = "default_serial_port")]
    pub serial_port: String,
    /// Volume floor in dB, mapped to 0 %.
    #[serde(default = "default_min_volume")]
    pub min_volume: i32,
    /// Volume ceiling in dB, mapped to 100 %.
    #[serde(default = "default_max_volume")]
    pub max_volume: i32,
    /// Volume step in dB.
    #[serde(default = "default_volume_step")]
    pub volume_step: i32,
    /// Source codes and names for line-protocol receivers.
    #[serde(default)]
    pub sources: Option<SourceMap>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_serial_port() -> String {
    DEFAULT_SERIAL_PORT.to_string()
}

fn default_min_volume() -> i32 {
    DEFAULT_MIN_VOLUME
}

fn default_max_volume() -> i32 {
    DEFAULT_MAX_VOLUME
}

fn default_volume_step() -> i32 {
    DEFAULT_VOLUME_STEP
}

impl DeviceConfig {
    fn base(identifier: DeviceId, connection_type: ConnectionType) -> Self {
        Self {
            name: format!("NAD {}", identifier.as_str()),
            identifier,
            connection_type,
            host: None,
            port: DEFAULT_PORT,
            serial_port: DEFAULT_SERIAL_PORT.to_string(),
            min_volume: DEFAULT_MIN_VOLUME,
            max_volume: DEFAULT_MAX_VOLUME,
            volume_step: DEFAULT_VOLUME_STEP,
            sources: None,
        }
    }

    /// Creates a configuration for a receiver on the binary TCP dialect.
    #[must_use]
    pub fn tcp(host: impl Into<String>) -> Self {
        let host = host.into();
        let mut config = Self::base(
            DeviceId::from_host_port(&host, DEFAULT_PORT),
            ConnectionType::Tcp,
        );
        config.host = Some(host);
        config
    }

    /// Creates a configuration for a receiver reached over Telnet.
    #[must_use]
    pub fn telnet(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let mut config = Self::base(
            DeviceId::from_host_port(&host, port),
            ConnectionType::Telnet,
        );
        config.host = Some(host);
        config.port = port;
        config
    }

    /// Creates a configuration for a receiver on a serial port.
    #[must_use]
    pub fn serial(path: impl Into<String>) -> Self {
        let path = path.into();
        let mut config = Self::base(DeviceId::from_serial_path(&path), ConnectionType::Rs232);
        config.serial_port = path;
        config
    }

    /// Sets the user-facing name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the derived identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<DeviceId>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Sets the volume floor and ceiling in dB.
    #[must_use]
    pub fn with_volume_limits(mut self, min_volume: i32, max_volume: i32) -> Self {
        self.min_volume = min_volume;
        self.max_volume = max_volume;
        self
    }

    /// Sets the volume step in dB.
    #[must_use]
    pub fn with_volume_step(mut self, volume_step: i32) -> Self {
        self.volume_step = volume_step;
        self
    }

    /// Sets the source code map.
    #[must_use]
    pub fn with_sources(mut self, sources: SourceMap) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Checks the configuration for values no receiver could accept.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing host or serial path, a volume
    /// limit outside [`VOLUME_LIMIT_FLOOR`]..=[`VOLUME_LIMIT_CEILING`], an
    /// empty or inverted volume range, or a step outside 1..=[`MAX_VOLUME_STEP`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.connection_type {
            ConnectionType::Tcp | ConnectionType::Telnet => {
                if self.host.as_deref().is_none_or(|h| h.trim().is_empty()) {
                    return Err(ConfigError::MissingHost(self.connection_type.as_str()));
                }
            }
            ConnectionType::Rs232 => {
                if self.serial_port.trim().is_empty() {
                    return Err(ConfigError::MissingSerialPath);
                }
            }
        }
        for value in [self.min_volume, self.max_volume] {
            if !(VOLUME_LIMIT_FLOOR..=VOLUME_LIMIT_CEILING).contains(&value) {
                return Err(ConfigError::VolumeLimitOutOfBounds {
                    value,
                    min: VOLUME_LIMIT_FLOOR,
                    max: VOLUME_LIMIT_CEILING,
                });
            }
        }
        if self.min_volume >= self.max_volume {
            return Err(ConfigError::InvalidVolumeRange {
                min: self.min_volume,
                max: self.max_volume,
            });
        }
        if !(1..=MAX_VOLUME_STEP).contains(&self.volume_step) {
            return Err(ConfigError::InvalidVolumeStep {
                value: self.volume_step,
                max: MAX_VOLUME_STEP,
            });
        }
        Ok(())
    }

    /// Returns the native volume range for this receiver's dialect.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRange` if the limits are inverted.
    pub fn volume_range(&self) -> Result<VolumeRange, ValueError> {
        match self.connection_type {
            ConnectionType::Tcp => VolumeRange::half_decibels(self.min_volume, self.max_volume),
            ConnectionType::Telnet | ConnectionType::Rs232 => {
                VolumeRange::decibels(self.min_volume, self.max_volume)
            }
        }
    }

    /// Returns the configured source map, or an empty one.
    #[must_use]
    pub fn source_map(&self) -> SourceMap {
        self.sources.clone().unwrap_or_default()
    }

    /// Resolves a source name to what the dialect needs on the wire.
    ///
    /// TCP receivers take the name; line-protocol receivers need a code
    /// from the configured map.
    ///
    /// # Errors
    ///
    /// Returns `Error::SourceNotFound` if a line-protocol receiver has no
    /// code for `name`.
    pub fn source_selector(&self, name: &str) -> Result<SourceSelector, Error> {
        if !self.connection_type.uses_line_protocol() {
            return Ok(SourceSelector::Name(name.to_string()));
        }
        self.sources
            .as_ref()
            .and_then(|sources| sources.code_for(name))
            .map(SourceSelector::Code)
            .ok_or_else(|| Error::SourceNotFound(name.to_string()))
    }

    /// Returns a human-readable address for logs.
    #[must_use]
    pub fn address(&self) -> String {
        match self.connection_type {
            ConnectionType::Tcp => format!(
                "{}:{}",
                self.host.as_deref().unwrap_or_default(),
                crate::protocol::TCP_PORT
            ),
            ConnectionType::Telnet => {
                format!("{}:{}", self.host.as_deref().unwrap_or_default(), self.port)
            }
            ConnectionType::Rs232 => self.serial_port.clone(),
        }
    }
}

/// Timing and retry policy for connections and commands.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use nadav_lib::manager::ConnectionPolicy;
///
/// let policy = ConnectionPolicy::default()
///     .with_watchdog_interval(Duration::from_secs(60))
///     .with_command_attempts(3);
///
/// assert_eq!(policy.max_reconnect_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPolicy {
    /// Whether the device manager runs a watchdog per device.
    pub watchdog_enabled: bool,
    /// Time between watchdog checks.
    pub watchdog_interval: Duration,
    /// Pause between reconnection attempts within one watchdog check.
    pub reconnect_delay: Duration,
    /// Reconnection attempts per watchdog check.
    pub max_reconnect_attempts: u32,
    /// Total attempts for a command that hits transport errors.
    pub command_attempts: u32,
    /// Pause before reconnecting for a command retry.
    pub retry_delay: Duration,
    /// Pause between closing and reopening the transport.
    pub reconnect_pause: Duration,
    /// Pause after reopening the transport before sending.
    pub reconnect_settle: Duration,
    /// Bound on each read or round trip.
    pub io_timeout: Duration,
    /// Wait after a power command before refreshing.
    pub power_settle: Duration,
    /// Wait after a source command before refreshing.
    pub source_settle: Duration,
    /// Wait after a volume command before refreshing.
    pub volume_settle: Duration,
    /// Wait after a mute command before refreshing.
    pub mute_settle: Duration,
}

impl ConnectionPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy without pauses, for tests and simulators.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            watchdog_interval: Duration::from_millis(50),
            reconnect_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
            reconnect_pause: Duration::ZERO,
            reconnect_settle: Duration::ZERO,
            io_timeout: Duration::from_secs(1),
            power_settle: Duration::ZERO,
            source_settle: Duration::ZERO,
            volume_settle: Duration::ZERO,
            mute_settle: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Disables the per-device watchdog.
    #[must_use]
    pub fn without_watchdog(mut self) -> Self {
        self.watchdog_enabled = false;
        self
    }

    /// Sets the time between watchdog checks.
    #[must_use]
    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Sets the pause between reconnection attempts.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the reconnection attempts per watchdog check.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the total attempts per command.
    #[must_use]
    pub fn with_command_attempts(mut self, attempts: u32) -> Self {
        self.command_attempts = attempts;
        self
    }

    /// Sets the bound on each read or round trip.
    #[must_use]
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            watchdog_enabled: true,
            watchdog_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 3,
            command_attempts: 2,
            retry_delay: Duration::from_millis(500),
            reconnect_pause: Duration::from_millis(200),
            reconnect_settle: Duration::from_millis(500),
            io_timeout: Duration::from_secs(5),
            power_settle: Duration::from_millis(500),
            source_settle: Duration::from_millis(500),
            volume_settle: Duration::from_millis(300),
            mute_settle: Duration::from_millis(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_config_creation() {
        let config = DeviceConfig::tcp("192.168.1.40");

        assert_eq!(config.connection_type, ConnectionType::Tcp);
        assert_eq!(config.host.as_deref(), Some("192.168.1.40"));
        assert_eq!(config.identifier, DeviceId::new("192.168.1.40_53"));
        assert_eq!(config.address(), "192.168.1.40:50001");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn telnet_and_serial_identifiers() {
        let telnet = DeviceConfig::telnet("amp.local", 23);
        assert_eq!(telnet.identifier.as_str(), "amp.local_23");
        assert_eq!(telnet.address(), "amp.local:23");

        let serial = DeviceConfig::serial("/dev/ttyS1");
        assert_eq!(serial.identifier.as_str(), "_dev_ttyS1");
        assert_eq!(serial.address(), "/dev/ttyS1");
    }

    #[test]
    fn validation_errors() {
        let mut config = DeviceConfig::tcp("host");
        config.host = None;
        assert!(matches!(config.validate(), Err(ConfigError::MissingHost("TCP"))));

        let config = DeviceConfig::serial("  ");
        assert!(matches!(config.validate(), Err(ConfigError::MissingSerialPath)));

        let config = DeviceConfig::telnet("host", 23).with_volume_limits(-20, -20);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVolumeRange { min: -20, max: -20 })
        ));

        let config = DeviceConfig::tcp("host").with_volume_step(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVolumeStep { value: 0, .. })
        ));
    }

    #[test]
    fn out_of_bounds_volume_values_rejected() {
        let config = DeviceConfig::tcp("host").with_volume_step(1_500_000_000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVolumeStep { value: 1_500_000_000, max: 20 })
        ));

        let config = DeviceConfig::tcp("host").with_volume_limits(i32::MIN, -20);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::VolumeLimitOutOfBounds { value: i32::MIN, .. })
        ));

        let config = DeviceConfig::serial("/dev/ttyUSB0").with_volume_limits(-60, 1_000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::VolumeLimitOutOfBounds { value: 1_000, min: -99, max: 30 })
        ));

        let config = DeviceConfig::tcp("host")
            .with_volume_limits(VOLUME_LIMIT_FLOOR, VOLUME_LIMIT_CEILING)
            .with_volume_step(MAX_VOLUME_STEP);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn volume_range_follows_dialect() {
        let tcp = DeviceConfig::tcp("host").volume_range().unwrap();
        assert_eq!((tcp.min(), tcp.max()), (-4, 140));

        let line = DeviceConfig::telnet("host", 23).volume_range().unwrap();
        assert_eq!((line.min(), line.max()), (-92, -20));
    }

    #[test]
    fn source_selector_resolution() {
        let tcp = DeviceConfig::tcp("host");
        assert_eq!(
            tcp.source_selector("Tuner").unwrap(),
            SourceSelector::Name("Tuner".to_string())
        );

        let sources: SourceMap = [(1, "CD"), (2, "Tuner")].into_iter().collect();
        let serial = DeviceConfig::serial("/dev/ttyUSB0").with_sources(sources);
        assert_eq!(serial.source_selector("Tuner").unwrap(), SourceSelector::Code(2));
        assert!(matches!(
            serial.source_selector("Phono"),
            Err(Error::SourceNotFound(name)) if name == "Phono"
        ));

        let unmapped = DeviceConfig::telnet("host", 23);
        assert!(unmapped.source_selector("CD").is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "identifier": "10.0.0.5_53",
            "name": "Den",
            "connection_type": "Telnet",
            "host": "10.0.0.5"
        }"#;
        let config: DeviceConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.serial_port, DEFAULT_SERIAL_PORT);
        assert_eq!(config.min_volume, -92);
        assert_eq!(config.max_volume, -20);
        assert_eq!(config.volume_step, 4);
        assert_eq!(config.sources, None);
    }

    #[test]
    fn connection_type_serde_names() {
        assert_eq!(serde_json::to_string(&ConnectionType::Rs232).unwrap(), r#""RS232""#);
        assert_eq!(
            serde_json::from_str::<ConnectionType>(r#""TCP""#).unwrap(),
            ConnectionType::Tcp
        );
    }

    #[test]
    fn policy_defaults() {
        let policy = ConnectionPolicy::default();

        assert!(policy.watchdog_enabled);
        assert_eq!(policy.watchdog_interval, Duration::from_secs(30));
        assert_eq!(policy.reconnect_delay, Duration::from_secs(5));
        assert_eq!(policy.command_attempts, 2);
        assert_eq!(policy.volume_settle, Duration::from_millis(300));
    }

    #[test]
    fn immediate_policy_has_no_pauses() {
        let policy = ConnectionPolicy::immediate().without_watchdog();

        assert!(!policy.watchdog_enabled);
        assert_eq!(policy.retry_delay, Duration::ZERO);
        assert_eq!(policy.power_settle, Duration::ZERO);
        assert!(policy.io_timeout > Duration::ZERO);
    }
}
