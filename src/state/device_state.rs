// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver state tracking.

use std::fmt;

use serde::Serialize;

use crate::protocol::ReceiverStatus;
use crate::types::Volume;

use super::{MediaState, StateUpdate};

/// Connection state of a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No transport is open.
    #[default]
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// A transport is open and the adapter is ready.
    Connected,
}

impl ConnectionStatus {
    /// Returns `true` when commands can be sent.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

/// Last known state of a receiver.
///
/// Values are only as fresh as the last successful refresh. When a refresh
/// after a command fails, the optimistic fields are rolled back and
/// [`is_stale`](Self::is_stale) reports `true` until the next successful
/// refresh.
///
/// # Examples
///
/// ```
/// use nadav_lib::state::DeviceState;
/// use nadav_lib::types::Volume;
///
/// let mut state = DeviceState::new();
/// state.set_power(true);
/// state.set_volume(Volume::new(35).unwrap());
///
/// let update = state.to_update();
/// assert_eq!(update.volume, 35);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    power: bool,
    volume: Volume,
    muted: bool,
    source: Option<String>,
    source_list: Vec<String>,
    connection: ConnectionStatus,
    stale: bool,
}

impl DeviceState {
    /// Creates the initial state: powered off, silent, disconnected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last known power state.
    #[must_use]
    pub fn power(&self) -> bool {
        self.power
    }

    /// Returns the last known volume.
    #[must_use]
    pub fn volume(&self) -> Volume {
        self.volume
    }

    /// Returns the last known mute state.
    #[must_use]
    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Returns the last known source name.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Returns the selectable source names.
    #[must_use]
    pub fn source_list(&self) -> &[String] {
        &self.source_list
    }

    /// Returns the connection status.
    #[must_use]
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    /// Returns `true` if the values could not be confirmed after the last command.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn set_power(&mut self, power: bool) {
        self.power = power;
    }

    pub fn set_volume(&mut self, volume: Volume) {
        self.volume = volume;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    pub fn set_source_list(&mut self, sources: Vec<String>) {
        self.source_list = sources;
    }

    pub fn set_connection(&mut self, status: ConnectionStatus) {
        self.connection = status;
    }

    /// Applies a status read from the receiver and clears the stale flag.
    ///
    /// A partial status (power only) leaves mute, volume and source untouched.
    /// Returns `true` if any value changed.
    pub fn apply_status(&mut self, status: &ReceiverStatus) -> bool {
        let before = self.clone();
        self.power = status.power;
        if !status.is_partial() {
            if let Some(muted) = status.muted {
                self.muted = muted;
            }
            if let Some(volume) = status.volume {
                self.volume = volume;
            }
            self.source.clone_from(&status.source);
        }
        self.stale = false;
        *self != before
    }

    /// Restores the command-affected fields from `snapshot` and flags the
    /// state as stale.
    pub fn revert_to(&mut self, snapshot: &Self) {
        self.power = snapshot.power;
        self.volume = snapshot.volume;
        self.muted = snapshot.muted;
        self.source.clone_from(&snapshot.source);
        self.stale = true;
    }

    /// Builds the attribute set reported to the platform.
    #[must_use]
    pub fn to_update(&self) -> StateUpdate {
        StateUpdate {
            state: MediaState::from(self.power),
            volume: self.volume.value(),
            muted: self.muted,
            source: self.source.clone(),
        }
    }
}
