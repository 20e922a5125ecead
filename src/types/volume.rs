// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalized volume type.
//!
//! The platform exposes loudness as a percentage; receivers speak decibels.
//! [`Volume`] is the platform side of that mapping and is always within
//! 0-100.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Volume level as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use nadav_lib::types::Volume;
///
/// let vol = Volume::new(40).unwrap();
/// assert_eq!(vol.value(), 40);
///
/// assert_eq!(Volume::MIN.value(), 0);
/// assert_eq!(Volume::MAX.value(), 100);
///
/// // Invalid values return error
/// assert!(Volume::new(101).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Volume(u8);

impl Volume {
    /// Silent (0%).
    pub const MIN: Self = Self(0);

    /// Full scale (100%).
    pub const MAX: Self = Self(100);

    /// Creates a new volume value.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: i32::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a volume value, clamping to the valid range.
    ///
    /// # Examples
    ///
    /// ```
    /// use nadav_lib::types::Volume;
    ///
    /// assert_eq!(Volume::clamped(-5).value(), 0);
    /// assert_eq!(Volume::clamped(150).value(), 100);
    /// ```
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        // Safe: clamped into 0..=100 first
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let v = value.clamp(0, 100) as u8;
        Self(v)
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the value as a float between 0.0 and 1.0.
    #[must_use]
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Volume {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Volume> for u8 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}

/// Direction of a relative volume step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepDirection {
    /// Louder.
    Up,
    /// Quieter.
    Down,
}

impl StepDirection {
    /// Returns `1` for up and `-1` for down.
    #[must_use]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }
}
