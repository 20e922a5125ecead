// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device event types.

use crate::state::StateUpdate;

use super::DeviceId;

/// Events emitted by receiver devices and the device manager.
///
/// # Examples
///
/// ```
/// use nadav_lib::event::{DeviceEvent, DeviceId};
///
/// let device_id = DeviceId::new("192.168.1.40_53");
///
/// let added = DeviceEvent::device_added(device_id.clone());
/// assert!(added.is_lifecycle());
///
/// let lost = DeviceEvent::disconnected_with_error(device_id, "connection reset");
/// assert!(lost.is_connection());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A device was added to the manager.
    DeviceAdded {
        /// The ID of the added device.
        device_id: DeviceId,
    },

    /// A device was removed from the manager.
    DeviceRemoved {
        /// The ID of the removed device.
        device_id: DeviceId,
    },

    /// Device connection state changed.
    ConnectionChanged {
        /// The ID of the device.
        device_id: DeviceId,
        /// Whether the device is now connected.
        connected: bool,
        /// Error message if disconnection was due to an error.
        error: Option<String>,
    },

    /// A state refresh completed; carries the reconciled snapshot.
    StateChanged {
        /// The ID of the device.
        device_id: DeviceId,
        /// Attributes for the platform entity.
        update: StateUpdate,
    },
}

impl DeviceEvent {
    /// Returns the device ID associated with this event.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        match self {
            Self::DeviceAdded { device_id }
            | Self::DeviceRemoved { device_id }
            | Self::ConnectionChanged { device_id, .. }
            | Self::StateChanged { device_id, .. } => device_id,
        }
    }

    /// Returns `true` if this is a device lifecycle event (added/removed).
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::DeviceAdded { .. } | Self::DeviceRemoved { .. })
    }

    /// Returns `true` if this is a connection event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }

    /// Returns `true` if this is a state change event.
    #[must_use]
    pub fn is_state_change(&self) -> bool {
        matches!(self, Self::StateChanged { .. })
    }

    /// Creates a device added event.
    #[must_use]
    pub fn device_added(device_id: DeviceId) -> Self {
        Self::DeviceAdded { device_id }
    }

    /// Creates a device removed event.
    #[must_use]
    pub fn device_removed(device_id: DeviceId) -> Self {
        Self::DeviceRemoved { device_id }
    }

    /// Creates a connected event.
    #[must_use]
    pub fn connected(device_id: DeviceId) -> Self {
        Self::ConnectionChanged {
            device_id,
            connected: true,
            error: None,
        }
    }

    /// Creates a disconnected event.
    #[must_use]
    pub fn disconnected(device_id: DeviceId) -> Self {
        Self::ConnectionChanged {
            device_id,
            connected: false,
            error: None,
        }
    }

    /// Creates a disconnected event with an error.
    #[must_use]
    pub fn disconnected_with_error(device_id: DeviceId, error: impl Into<String>) -> Self {
        Self::ConnectionChanged {
            device_id,
            connected: false,
            error: Some(error.into()),
        }
    }

    /// Creates a state changed event.
    #[must_use]
    pub fn state_changed(device_id: DeviceId, update: StateUpdate) -> Self {
        Self::StateChanged { device_id, update }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DeviceState;

    #[test]
    fn device_id_extraction() {
        let id = DeviceId::new("amp");

        assert_eq!(DeviceEvent::device_added(id.clone()).device_id(), &id);
        assert_eq!(DeviceEvent::device_removed(id.clone()).device_id(), &id);
        assert_eq!(DeviceEvent::connected(id.clone()).device_id(), &id);
    }

    #[test]
    fn event_kinds() {
        let id = DeviceId::new("amp");

        assert!(DeviceEvent::device_added(id.clone()).is_lifecycle());
        assert!(DeviceEvent::disconnected(id.clone()).is_connection());
        assert!(!DeviceEvent::connected(id.clone()).is_lifecycle());

        let event = DeviceEvent::state_changed(id, DeviceState::new().to_update());
        assert!(event.is_state_change());
        assert!(!event.is_connection());
    }

    #[test]
    fn disconnected_with_error() {
        let id = DeviceId::new("amp");
        let event = DeviceEvent::disconnected_with_error(id, "Connection lost");

        assert_eq!(
            event,
            DeviceEvent::ConnectionChanged {
                device_id: DeviceId::new("amp"),
                connected: false,
                error: Some("Connection lost".to_string()),
            }
        );
    }
}
