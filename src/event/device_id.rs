// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a configured receiver.
///
/// The identifier is derived once at setup time from the device address and
/// is the join key between the persisted configuration, the device manager
/// and the platform entity.
///
/// # Examples
///
/// ```
/// use nadav_lib::event::DeviceId;
///
/// let id = DeviceId::from_host_port("192.168.1.40", 53);
/// assert_eq!(id.as_str(), "192.168.1.40_53");
///
/// let id = DeviceId::from_serial_path("/dev/ttyUSB0");
/// assert_eq!(id.as_str(), "_dev_ttyUSB0");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the identifier of a network receiver.
    #[must_use]
    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self(format!("{host}_{port}"))
    }

    /// Derives the identifier of a serial receiver from its port path.
    #[must_use]
    pub fn from_serial_path(path: &str) -> Self {
        Self(path.replace(['/', '\\'], "_"))
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
