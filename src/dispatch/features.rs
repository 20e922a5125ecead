// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Feature set and descriptor of the media player entity.

use serde::Serialize;

use crate::event::DeviceId;
use crate::manager::ReceiverDevice;
use crate::state::DeviceState;

/// A capability advertised to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Separate on and off commands.
    OnOff,
    /// Power toggle.
    Toggle,
    /// Absolute volume.
    Volume,
    /// Volume steps.
    VolumeUpDown,
    /// Mute toggle.
    MuteToggle,
    /// Explicit mute.
    Mute,
    /// Explicit unmute.
    Unmute,
    /// Input selection.
    SelectSource,
}

const ALWAYS: [Feature; 7] = [
    Feature::OnOff,
    Feature::Toggle,
    Feature::Volume,
    Feature::VolumeUpDown,
    Feature::MuteToggle,
    Feature::Mute,
    Feature::Unmute,
];

/// The features a receiver entity advertises.
///
/// # Examples
///
/// ```
/// use nadav_lib::dispatch::{EntityFeatures, Feature};
/// use nadav_lib::state::DeviceState;
///
/// let mut state = DeviceState::new();
/// assert!(!EntityFeatures::for_device(&state).contains(Feature::SelectSource));
///
/// state.set_source_list(vec!["CD".to_string()]);
/// assert!(EntityFeatures::for_device(&state).contains(Feature::SelectSource));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EntityFeatures(Vec<Feature>);

impl EntityFeatures {
    /// Source selection is only offered when there is something to select.
    #[must_use]
    pub fn for_device(state: &DeviceState) -> Self {
        let mut features = ALWAYS.to_vec();
        if !state.source_list().is_empty() {
            features.push(Feature::SelectSource);
        }
        Self(features)
    }

    /// Returns `true` if `feature` is advertised.
    #[must_use]
    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    /// Returns the features in advertisement order.
    #[must_use]
    pub fn as_slice(&self) -> &[Feature] {
        &self.0
    }
}

/// Initial attributes of a freshly registered entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityAttributes {
    /// Always `UNKNOWN` until the first refresh.
    pub state: &'static str,
    /// Volume in percent.
    pub volume: u8,
    /// Mute state.
    pub muted: bool,
    /// Selectable sources, omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_list: Vec<String>,
}

/// Everything the platform needs to register a receiver entity.
///
/// # Examples
///
/// ```
/// use nadav_lib::dispatch::EntityDescriptor;
/// use nadav_lib::manager::{ConnectionPolicy, DeviceConfig, ReceiverDevice};
///
/// let config = DeviceConfig::tcp("192.168.1.40").with_name("Den");
/// let device = ReceiverDevice::new(config, ConnectionPolicy::default()).unwrap();
///
/// let descriptor = EntityDescriptor::for_device(&device);
/// assert_eq!(descriptor.device_class, "RECEIVER");
/// assert_eq!(descriptor.volume_steps, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityDescriptor {
    /// Entity identifier, equal to the device identifier.
    pub identifier: DeviceId,
    /// Display name.
    pub name: String,
    /// Device class.
    pub device_class: &'static str,
    /// Advertised features.
    pub features: EntityFeatures,
    /// Initial attributes.
    pub attributes: EntityAttributes,
    /// Number of volume steps the platform slider offers.
    pub volume_steps: u8,
}

impl EntityDescriptor {
    /// Describes `device` as a media player entity.
    #[must_use]
    pub fn for_device(device: &ReceiverDevice) -> Self {
        let state = device.state();
        Self {
            identifier: device.id().clone(),
            name: device.name().to_string(),
            device_class: "RECEIVER",
            features: EntityFeatures::for_device(state),
            attributes: EntityAttributes {
                state: "UNKNOWN",
                volume: 0,
                muted: false,
                source_list: state.source_list().to_vec(),
            },
            volume_steps: 100,
        }
    }
}
