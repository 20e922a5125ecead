// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parsing of line-dialect replies.

use crate::error::ProtocolError;

/// Extracts the value from `line` if it answers `prefix` (e.g. `"Main.Power="`).
///
/// Receivers may echo the attribute in a different case, so the prefix match
/// ignores ASCII case.
///
/// # Examples
///
/// ```
/// use nadav_lib::command::reply_value;
///
/// assert_eq!(reply_value("Main.Power=On", "Main.Power="), Some("On"));
/// assert_eq!(reply_value("Main.Mute=Off", "Main.Power="), None);
/// ```
#[must_use]
pub fn reply_value<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let line = line.trim();
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| line[prefix.len()..].trim())
}

/// Parses an `On`/`Off` value.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidValue` for anything else.
pub fn parse_on_off(field: &str, value: &str) -> Result<bool, ProtocolError> {
    if value.eq_ignore_ascii_case("on") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("off") {
        Ok(false)
    } else {
        Err(invalid(field, format!("expected On or Off, got {value:?}")))
    }
}

/// Parses a dB value, rounding fractional replies such as `-40.5`.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidValue` if the value is not numeric.
pub fn parse_volume_db(value: &str) -> Result<i32, ProtocolError> {
    let db: f64 = value
        .parse()
        .map_err(|_| invalid("volume", format!("expected dB value, got {value:?}")))?;
    if !db.is_finite() || db.abs() > 1000.0 {
        return Err(invalid("volume", format!("dB value out of range: {value}")));
    }
    // Safe: bounded to +/-1000 above
    #[allow(clippy::cast_possible_truncation)]
    Ok(db.round() as i32)
}

/// Parses a numeric source code.
///
/// # Errors
///
/// Returns `ProtocolError::InvalidValue` if the value is not a small integer.
pub fn parse_source_code(value: &str) -> Result<u8, ProtocolError> {
    value
        .parse()
        .map_err(|_| invalid("source", format!("expected source code, got {value:?}")))
}

fn invalid(field: &str, message: String) -> ProtocolError {
    ProtocolError::InvalidValue {
        field: field.to_string(),
        message,
    }
}
