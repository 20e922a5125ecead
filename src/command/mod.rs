// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! NAD line-protocol command definitions.
//!
//! Telnet and RS-232 receivers speak a line-oriented ASCII dialect. Every
//! command addresses one attribute of the main zone and carries an operator:
//!
//! | Operator | Meaning | Example |
//! |----------|---------|---------|
//! | `?` | Query | `Main.Power?` |
//! | `=` | Set | `Main.Volume=-40` |
//! | `+` | Increase | `Main.Volume+` |
//! | `-` | Decrease | `Main.Volume-` |
//!
//! The receiver answers with `Main.<Attribute>=<value>`.
//!
//! # Examples
//!
//! ```
//! use nadav_lib::command::{Attribute, Command, MainCommand};
//!
//! let cmd = MainCommand::set_power(true);
//! assert_eq!(cmd.name(), "Main.Power");
//! assert_eq!(cmd.payload(), "=On");
//! assert_eq!(cmd.to_line(), "Main.Power=On");
//!
//! let query = MainCommand::query(Attribute::Volume);
//! assert_eq!(query.to_line(), "Main.Volume?");
//! ```

mod main_zone;
mod reply;

pub use main_zone::{Attribute, MainCommand, Operation};
pub use reply::{parse_on_off, parse_source_code, parse_volume_db, reply_value};

/// Line terminator used in both directions.
pub const LINE_TERMINATOR: u8 = b'\r';

/// A command that can be sent to a line-dialect NAD receiver.
pub trait Command {
    /// Returns the addressed attribute, e.g. `"Main.Power"`.
    fn name(&self) -> String;

    /// Returns the operator and value, e.g. `"?"`, `"=On"`, `"+"`.
    fn payload(&self) -> String;

    /// Returns the command text without framing.
    fn to_line(&self) -> String {
        format!("{}{}", self.name(), self.payload())
    }

    /// Returns the framed bytes written to the transport.
    ///
    /// A leading terminator flushes any partial input the receiver may be
    /// holding from line noise.
    fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.name().len() + 8);
        bytes.push(LINE_TERMINATOR);
        bytes.extend_from_slice(self.to_line().as_bytes());
        bytes.push(LINE_TERMINATOR);
        bytes
    }

    /// Returns the prefix that identifies the reply to this command.
    fn reply_prefix(&self) -> String {
        format!("{}=", self.name())
    }
}
