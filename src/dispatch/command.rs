// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Media player command envelope and result codes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Media player command identifiers.
///
/// Identifiers this crate does not handle are kept verbatim in
/// [`CommandId::Other`] so they can be reported as not implemented.
///
/// # Examples
///
/// ```
/// use nadav_lib::dispatch::CommandId;
///
/// assert_eq!(CommandId::from("VOLUME_UP"), CommandId::VolumeUp);
/// assert_eq!(CommandId::from("SHUFFLE"), CommandId::Other("SHUFFLE".to_string()));
/// assert_eq!(CommandId::MuteToggle.as_str(), "MUTE_TOGGLE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandId {
    /// `ON`
    On,
    /// `OFF`
    Off,
    /// `TOGGLE`
    Toggle,
    /// `VOLUME` with `params.volume`.
    Volume,
    /// `VOLUME_UP`
    VolumeUp,
    /// `VOLUME_DOWN`
    VolumeDown,
    /// `MUTE_TOGGLE`
    MuteToggle,
    /// `MUTE`
    Mute,
    /// `UNMUTE`
    Unmute,
    /// `SELECT_SOURCE` with `params.source`.
    SelectSource,
    /// Any other identifier.
    Other(String),
}

impl CommandId {
    /// Returns the wire identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Toggle => "TOGGLE",
            Self::Volume => "VOLUME",
            Self::VolumeUp => "VOLUME_UP",
            Self::VolumeDown => "VOLUME_DOWN",
            Self::MuteToggle => "MUTE_TOGGLE",
            Self::Mute => "MUTE",
            Self::Unmute => "UNMUTE",
            Self::SelectSource => "SELECT_SOURCE",
            Self::Other(id) => id,
        }
    }
}

impl From<&str> for CommandId {
    fn from(id: &str) -> Self {
        match id {
            "ON" => Self::On,
            "OFF" => Self::Off,
            "TOGGLE" => Self::Toggle,
            "VOLUME" => Self::Volume,
            "VOLUME_UP" => Self::VolumeUp,
            "VOLUME_DOWN" => Self::VolumeDown,
            "MUTE_TOGGLE" => Self::MuteToggle,
            "MUTE" => Self::Mute,
            "UNMUTE" => Self::Unmute,
            "SELECT_SOURCE" => Self::SelectSource,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for CommandId {
    fn from(id: String) -> Self {
        Self::from(id.as_str())
    }
}

impl From<CommandId> for String {
    fn from(id: CommandId) -> Self {
        match id {
            CommandId::Other(id) => id,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command addressed to the media player entity.
///
/// # Examples
///
/// ```
/// use nadav_lib::dispatch::{CommandId, MediaPlayerCommand};
///
/// let command: MediaPlayerCommand =
///     serde_json::from_str(r#"{"cmd_id":"VOLUME","params":{"volume":40}}"#).unwrap();
/// assert_eq!(command.cmd_id, CommandId::Volume);
/// assert_eq!(command.param("volume"), Some(&serde_json::json!(40)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaPlayerCommand {
    /// The command identifier.
    pub cmd_id: CommandId,
    /// Optional command parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

impl MediaPlayerCommand {
    /// Creates a command without parameters.
    #[must_use]
    pub fn new(cmd_id: impl Into<CommandId>) -> Self {
        Self {
            cmd_id: cmd_id.into(),
            params: None,
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|params| params.get(key))
    }
}

/// Result of handling a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The command was carried out.
    Ok,
    /// Parameters were missing or malformed.
    BadRequest,
    /// The receiver could not carry out the command.
    ServerError,
    /// The command is not supported.
    NotImplemented,
}

impl StatusCode {
    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::ServerError => 500,
            Self::NotImplemented => 501,
        }
    }

    /// Returns `true` for [`StatusCode::Ok`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::BadRequest => "BAD_REQUEST",
            Self::ServerError => "SERVER_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
        };
        write!(f, "{} {name}", self.code())
    }
}
