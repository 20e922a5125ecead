// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the NAD receiver library.
//!
//! This module provides the error hierarchy used across the library:
//! transport failures (retryable), protocol failures (malformed or
//! unexpected receiver output), value validation, and configuration.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The byte transport to the receiver failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The receiver answered with something we could not understand.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The device configuration is invalid or could not be persisted.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The requested input source is not known for this receiver.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// The device is not connected and could not be connected.
    #[error("device is not connected")]
    NotConnected,

    /// Device was not found in the manager.
    #[error("device not found")]
    DeviceNotFound,
}

impl Error {
    /// Returns `true` if retrying the same call after a reconnect may succeed.
    ///
    /// Only transport failures qualify; a protocol mismatch or a bad source
    /// name will fail the same way on every attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_retryable())
    }
}

/// Errors raised by the byte transport (TCP socket, Telnet session, serial port).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying I/O failure (connection reset, broken pipe, refused).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or configured.
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// No reply arrived in time.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,
}

impl TransportError {
    /// Returns `true` for failures worth a reconnect-and-retry.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Errors related to the receiver's wire dialect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A reply field could not be parsed.
    #[error("failed to parse {field}: {message}")]
    InvalidValue {
        /// The field that failed to parse.
        field: String,
        /// Description of the parsing failure.
        message: String,
    },

    /// The receiver reported a source code we have no name for.
    #[error("unknown source code {0:#04x}")]
    UnknownSourceCode(u8),

    /// A binary status reply was shorter than required.
    #[error("short frame: expected {expected} bytes, got {actual}")]
    ShortFrame {
        /// Required length in bytes.
        expected: usize,
        /// Received length in bytes.
        actual: usize,
    },
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value is outside the allowed range.
    #[error("value {actual} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Minimum allowed value.
        min: i32,
        /// Maximum allowed value.
        max: i32,
        /// The actual value that was provided.
        actual: i32,
    },

    /// A native range whose floor is not below its ceiling.
    #[error("invalid range: min {min} must be below max {max}")]
    InvalidRange {
        /// Range floor.
        min: i32,
        /// Range ceiling.
        max: i32,
    },
}

/// Errors related to device configuration and its persistence.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TCP and Telnet devices need a host.
    #[error("host is required for {0} connections")]
    MissingHost(&'static str),

    /// RS-232 devices need a serial port path.
    #[error("serial port path is required for RS232 connections")]
    MissingSerialPath,

    /// `min_volume` must be below `max_volume`.
    #[error("min_volume {min} must be below max_volume {max}")]
    InvalidVolumeRange {
        /// Configured floor in dB.
        min: i32,
        /// Configured ceiling in dB.
        max: i32,
    },

    /// A volume limit lies outside what any receiver accepts.
    #[error("volume limit {value} dB outside {min}..={max} dB")]
    VolumeLimitOutOfBounds {
        /// Offending limit in dB.
        value: i32,
        /// Lowest accepted limit in dB.
        min: i32,
        /// Highest accepted limit in dB.
        max: i32,
    },

    /// `volume_step` must be between 1 dB and the step ceiling.
    #[error("volume_step must be between 1 and {max} dB, got {value}")]
    InvalidVolumeStep {
        /// Configured step in dB.
        value: i32,
        /// Largest accepted step in dB.
        max: i32,
    },

    /// The crate was built without RS-232 support.
    #[error("RS232 support is not enabled in this build")]
    SerialUnsupported,

    /// Reading or writing the config file failed.
    #[error("config file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for our schema.
    #[error("config file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
