// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver state types.
//!
//! [`DeviceState`] is the last known state of one receiver, and
//! [`StateUpdate`] is the attribute set pushed to the platform after a
//! refresh.
//!
//! # Examples
//!
//! ```
//! use nadav_lib::state::{DeviceState, MediaState};
//!
//! let mut state = DeviceState::new();
//! state.set_power(true);
//!
//! assert_eq!(state.to_update().state, MediaState::On);
//! ```

mod device_state;
mod state_update;

pub use device_state::{ConnectionStatus, DeviceState};
pub use state_update::{MediaState, StateUpdate};
