// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Main zone commands.

use crate::command::Command;
use crate::types::StepDirection;

/// Main zone attribute addressed by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// `Main.Power`
    Power,
    /// `Main.Volume`, in dB.
    Volume,
    /// `Main.Mute`
    Mute,
    /// `Main.Source`, a numeric code.
    Source,
}

impl Attribute {
    /// Returns the attribute name without the zone prefix.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Power => "Power",
            Self::Volume => "Volume",
            Self::Mute => "Mute",
            Self::Source => "Source",
        }
    }
}

/// What a command does to its attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Ask for the current value.
    Query,
    /// Assign a value.
    Set(String),
    /// Step up one receiver-defined increment.
    Increase,
    /// Step down one receiver-defined increment.
    Decrease,
}

/// A command against the receiver's main zone.
///
/// # Examples
///
/// ```
/// use nadav_lib::command::{Command, MainCommand};
/// use nadav_lib::types::StepDirection;
///
/// assert_eq!(MainCommand::set_volume(-48).to_line(), "Main.Volume=-48");
/// assert_eq!(MainCommand::step_volume(StepDirection::Down).to_line(), "Main.Volume-");
/// assert_eq!(MainCommand::set_source(3).to_line(), "Main.Source=3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainCommand {
    attribute: Attribute,
    operation: Operation,
}

impl MainCommand {
    /// Creates a query for `attribute`.
    #[must_use]
    pub const fn query(attribute: Attribute) -> Self {
        Self {
            attribute,
            operation: Operation::Query,
        }
    }

    /// Creates a power on/off command.
    #[must_use]
    pub fn set_power(on: bool) -> Self {
        Self::set(Attribute::Power, on_off(on))
    }

    /// Creates a mute on/off command.
    #[must_use]
    pub fn set_mute(muted: bool) -> Self {
        Self::set(Attribute::Mute, on_off(muted))
    }

    /// Creates an absolute volume command in dB.
    #[must_use]
    pub fn set_volume(db: i32) -> Self {
        Self::set(Attribute::Volume, db.to_string())
    }

    /// Creates a relative volume step; the receiver applies its own increment.
    #[must_use]
    pub const fn step_volume(direction: StepDirection) -> Self {
        Self {
            attribute: Attribute::Volume,
            operation: match direction {
                StepDirection::Up => Operation::Increase,
                StepDirection::Down => Operation::Decrease,
            },
        }
    }

    /// Creates a source selection command by numeric code.
    #[must_use]
    pub fn set_source(code: u8) -> Self {
        Self::set(Attribute::Source, code.to_string())
    }

    fn set(attribute: Attribute, value: impl Into<String>) -> Self {
        Self {
            attribute,
            operation: Operation::Set(value.into()),
        }
    }

    /// Returns the addressed attribute.
    #[must_use]
    pub const fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// Returns the operation.
    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.operation
    }
}

impl Command for MainCommand {
    fn name(&self) -> String {
        format!("Main.{}", self.attribute.as_str())
    }

    fn payload(&self) -> String {
        match &self.operation {
            Operation::Query => "?".to_string(),
            Operation::Set(value) => format!("={value}"),
            Operation::Increase => "+".to_string(),
            Operation::Decrease => "-".to_string(),
        }
    }
}

const fn on_off(on: bool) -> &'static str {
    if on { "On" } else { "Off" }
}
