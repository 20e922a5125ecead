// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping platform media player commands onto receiver operations.
//!
//! # Examples
//!
//! ```no_run
//! use nadav_lib::dispatch::{MediaPlayerCommand, StatusCode, handle_command};
//! use nadav_lib::manager::{ConnectionPolicy, DeviceConfig, ReceiverDevice};
//!
//! # async fn example() -> nadav_lib::Result<()> {
//! let mut device = ReceiverDevice::new(DeviceConfig::tcp("192.168.1.40"), ConnectionPolicy::default())?;
//!
//! let command = MediaPlayerCommand::new("VOLUME").with_param("volume", 35);
//! let status = handle_command(&mut device, &command).await;
//! assert_eq!(status, StatusCode::Ok);
//! # Ok(())
//! # }
//! ```

mod command;
mod features;

pub use command::{CommandId, MediaPlayerCommand, StatusCode};
pub use features::{EntityAttributes, EntityDescriptor, EntityFeatures, Feature};

use serde_json::Value;

use crate::manager::ReceiverDevice;
use crate::types::Volume;

/// Runs `command` against `device`.
///
/// Toggles act on the last known state. Missing or malformed parameters
/// yield [`StatusCode::BadRequest`] without touching the receiver, and a
/// failed operation yields [`StatusCode::ServerError`].
pub async fn handle_command(device: &mut ReceiverDevice, command: &MediaPlayerCommand) -> StatusCode {
    tracing::info!(
        device = %device.id(),
        command = %command.cmd_id,
        params = ?command.params,
        "handling command"
    );

    let success = match &command.cmd_id {
        CommandId::On => device.turn_on().await,
        CommandId::Off => device.turn_off().await,
        CommandId::Toggle => {
            if device.state().power() {
                device.turn_off().await
            } else {
                device.turn_on().await
            }
        }
        CommandId::Volume => {
            let Some(volume) = volume_param(command.param("volume")) else {
                tracing::warn!(device = %device.id(), "invalid volume parameter");
                return StatusCode::BadRequest;
            };
            device.set_volume(volume).await
        }
        CommandId::VolumeUp => device.volume_up().await,
        CommandId::VolumeDown => device.volume_down().await,
        CommandId::MuteToggle => {
            let muted = device.state().muted();
            device.mute(!muted).await
        }
        CommandId::Mute => device.mute(true).await,
        CommandId::Unmute => device.mute(false).await,
        CommandId::SelectSource => {
            let Some(source) = command
                .param("source")
                .and_then(Value::as_str)
                .filter(|source| !source.is_empty())
            else {
                tracing::warn!(device = %device.id(), "select source without a source");
                return StatusCode::BadRequest;
            };
            device.select_source(source).await
        }
        CommandId::Other(id) => {
            tracing::warn!(device = %device.id(), command = %id, "unsupported command");
            return StatusCode::NotImplemented;
        }
    };

    if success {
        StatusCode::Ok
    } else {
        tracing::error!(device = %device.id(), command = %command.cmd_id, "command failed");
        StatusCode::ServerError
    }
}

/// Reads the `volume` parameter: absent means 0, numbers are truncated and
/// clamped to 0..=100, integer strings are accepted.
fn volume_param(value: Option<&Value>) -> Option<Volume> {
    let percent = match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => i,
            None => truncate(n.as_f64()?)?,
        },
        Some(Value::String(s)) => s.trim().parse().ok()?,
        Some(_) => return None,
    };
    Some(Volume::clamped(percent))
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> Option<i64> {
    // Float-to-int casts saturate.
    value.is_finite().then(|| value.trunc() as i64)
}
