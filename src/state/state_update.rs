// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute snapshot pushed to the platform after each refresh.

use serde::{Deserialize, Serialize};

/// Media player state as reported to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaState {
    /// Receiver is powered on.
    On,
    /// Receiver is in standby.
    Off,
}

impl From<bool> for MediaState {
    fn from(power: bool) -> Self {
        if power { Self::On } else { Self::Off }
    }
}

/// Reconciled receiver attributes.
///
/// # Examples
///
/// ```
/// use nadav_lib::state::{MediaState, StateUpdate};
///
/// let update = StateUpdate {
///     state: MediaState::On,
///     volume: 42,
///     muted: false,
///     source: Some("CD".to_string()),
/// };
///
/// let json = serde_json::to_string(&update).unwrap();
/// assert_eq!(json, r#"{"state":"ON","volume":42,"muted":false,"source":"CD"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// Power state.
    pub state: MediaState,
    /// Volume in percent.
    pub volume: u8,
    /// Mute state.
    pub muted: bool,
    /// Current source name, if known.
    pub source: Option<String>,
}
