// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion between percent volume and receiver-native units.
//!
//! NAD receivers use two native scales:
//!
//! - **Decibels**: the line dialect (Telnet, RS-232) reads and writes raw dB,
//!   e.g. `Main.Volume=-48`.
//! - **Half decibels**: the binary TCP dialect encodes `(dB + 90) * 2` in a
//!   single byte, so one native unit is 0.5 dB.
//!
//! Both are handled by the same linear mapping parameterized by the native
//! floor and ceiling.

use crate::error::ValueError;

use super::{StepDirection, Volume};

/// Offset added to a dB value before doubling on the TCP scale.
const HALF_DB_OFFSET: i32 = 90;

fn half_decibel(db: i32) -> Option<i32> {
    db.checked_add(HALF_DB_OFFSET)?.checked_mul(2)
}

/// Converts a percentage to a native value in `[min, max]`.
///
/// `native = round(percent / 100 * (max - min) + min)`
///
/// # Examples
///
/// ```
/// use nadav_lib::types::{percent_to_native, Volume};
///
/// assert_eq!(percent_to_native(Volume::MIN, -92, -20), -92);
/// assert_eq!(percent_to_native(Volume::MAX, -92, -20), -20);
/// assert_eq!(percent_to_native(Volume::new(50).unwrap(), -92, -20), -56);
/// ```
#[must_use]
// Safe: result lies between min and max, both i32
#[allow(clippy::cast_possible_truncation)]
pub fn percent_to_native(percent: Volume, min: i32, max: i32) -> i32 {
    let span = f64::from(max) - f64::from(min);
    (percent.as_fraction() * span + f64::from(min)).round() as i32
}

/// Converts a native value to a percentage, clamping outside `[min, max]`.
///
/// # Examples
///
/// ```
/// use nadav_lib::types::native_to_percent;
///
/// assert_eq!(native_to_percent(-100, -92, -20).value(), 0);
/// assert_eq!(native_to_percent(-10, -92, -20).value(), 100);
/// assert_eq!(native_to_percent(-56, -92, -20).value(), 50);
/// ```
#[must_use]
pub fn native_to_percent(native: i32, min: i32, max: i32) -> Volume {
    if native <= min {
        return Volume::MIN;
    }
    if native >= max {
        return Volume::MAX;
    }
    let span = f64::from(max) - f64::from(min);
    let percent = (f64::from(native) - f64::from(min)) / span * 100.0;
    // Safe: native is strictly inside the range, so percent is in (0, 100)
    #[allow(clippy::cast_possible_truncation)]
    let percent = percent.round() as i64;
    Volume::clamped(percent)
}

/// Native unit of a [`VolumeRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeUnit {
    /// Plain decibels.
    Decibel,
    /// `(dB + 90) * 2`, used by the binary TCP dialect.
    HalfDecibel,
}

/// A receiver's native volume range.
///
/// # Examples
///
/// ```
/// use nadav_lib::types::{Volume, VolumeRange};
///
/// let tcp = VolumeRange::half_decibels(-92, -20).unwrap();
/// assert_eq!(tcp.min(), -4);
/// assert_eq!(tcp.max(), 140);
///
/// let serial = VolumeRange::decibels(-92, -20).unwrap();
/// assert_eq!(serial.to_native(Volume::MAX), -20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeRange {
    min: i32,
    max: i32,
    unit: NativeUnit,
}

impl VolumeRange {
    /// Creates a plain decibel range.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRange` unless `min_db < max_db`.
    pub fn decibels(min_db: i32, max_db: i32) -> Result<Self, ValueError> {
        Self::checked(min_db, max_db, NativeUnit::Decibel)
    }

    /// Creates a half-decibel range from dB limits.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidRange` unless `min_db < max_db` and both
    /// limits fit the native scale.
    pub fn half_decibels(min_db: i32, max_db: i32) -> Result<Self, ValueError> {
        let invalid = ValueError::InvalidRange {
            min: min_db,
            max: max_db,
        };
        let (Some(min), Some(max)) = (half_decibel(min_db), half_decibel(max_db)) else {
            return Err(invalid);
        };
        Self::checked(min, max, NativeUnit::HalfDecibel)
    }

    fn checked(min: i32, max: i32, unit: NativeUnit) -> Result<Self, ValueError> {
        if min >= max {
            return Err(ValueError::InvalidRange { min, max });
        }
        Ok(Self { min, max, unit })
    }

    /// Native floor.
    #[must_use]
    pub const fn min(&self) -> i32 {
        self.min
    }

    /// Native ceiling.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Native unit of this range.
    #[must_use]
    pub const fn unit(&self) -> NativeUnit {
        self.unit
    }

    /// Converts a percentage to a native value.
    #[must_use]
    pub fn to_native(&self, volume: Volume) -> i32 {
        percent_to_native(volume, self.min, self.max)
    }

    /// Converts a native value to a percentage.
    #[must_use]
    pub fn to_percent(&self, native: i32) -> Volume {
        native_to_percent(native, self.min, self.max)
    }

    /// Native units covered by one configured dB step, saturating.
    #[must_use]
    pub const fn step_size(&self, volume_step_db: i32) -> i32 {
        match self.unit {
            NativeUnit::Decibel => volume_step_db,
            NativeUnit::HalfDecibel => volume_step_db.saturating_mul(2),
        }
    }

    /// Computes the absolute native target one step away from `current`.
    ///
    /// The result stays inside the configured range so a step never pushes
    /// the receiver past its configured ceiling.
    ///
    /// # Examples
    ///
    /// ```
    /// use nadav_lib::types::{StepDirection, Volume, VolumeRange};
    ///
    /// let range = VolumeRange::half_decibels(-92, -20).unwrap();
    /// let half = Volume::new(50).unwrap();
    /// assert_eq!(range.stepped(half, StepDirection::Up, 4), range.to_native(half) + 8);
    /// ```
    #[must_use]
    pub fn stepped(&self, current: Volume, direction: StepDirection, volume_step_db: i32) -> i32 {
        let delta = direction.sign().saturating_mul(self.step_size(volume_step_db));
        self.to_native(current)
            .saturating_add(delta)
            .clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vol(v: u8) -> Volume {
        Volume::new(v).unwrap()
    }

    #[test]
    fn percent_to_native_edges() {
        assert_eq!(percent_to_native(Volume::MIN, -92, -20), -92);
        assert_eq!(percent_to_native(Volume::MAX, -92, -20), -20);
        assert_eq!(percent_to_native(Volume::MIN, -4, 140), -4);
        assert_eq!(percent_to_native(Volume::MAX, -4, 140), 140);
    }

    #[test]
    fn percent_to_native_rounds_to_nearest() {
        // 0.33 * 72 - 92 = -68.24
        assert_eq!(percent_to_native(vol(33), -92, -20), -68);
        // 0.35 * 72 - 92 = -66.8
        assert_eq!(percent_to_native(vol(35), -92, -20), -67);
    }

    #[test]
    fn native_to_percent_clamps() {
        assert_eq!(native_to_percent(-200, -92, -20), Volume::MIN);
        assert_eq!(native_to_percent(-92, -92, -20), Volume::MIN);
        assert_eq!(native_to_percent(0, -92, -20), Volume::MAX);
        assert_eq!(native_to_percent(200, -4, 140), Volume::MAX);
    }

    #[test]
    fn round_trip_within_one_percent() {
        for (min, max) in [(-92, -20), (-4, 140), (-80, 10), (0, 200)] {
            for p in 0..=100 {
                let native = percent_to_native(vol(p), min, max);
                let back = i32::from(native_to_percent(native, min, max).value());
                assert!(
                    (back - i32::from(p)).abs() <= 1,
                    "{p}% -> {native} -> {back}% in [{min}, {max}]"
                );
            }
        }
    }

    #[test]
    fn half_decibel_range_from_db() {
        let range = VolumeRange::half_decibels(-92, -20).unwrap();
        assert_eq!(range.min(), -4);
        assert_eq!(range.max(), 140);
        assert_eq!(range.unit(), NativeUnit::HalfDecibel);
        assert_eq!(range.to_native(vol(50)), 68);
    }

    #[test]
    fn invalid_range_rejected() {
        assert_eq!(
            VolumeRange::decibels(-20, -20),
            Err(ValueError::InvalidRange { min: -20, max: -20 })
        );
        assert!(VolumeRange::half_decibels(-20, -92).is_err());
    }

    #[test]
    fn step_size_doubles_for_half_decibels() {
        let db = VolumeRange::decibels(-92, -20).unwrap();
        let half = VolumeRange::half_decibels(-92, -20).unwrap();
        assert_eq!(db.step_size(4), 4);
        assert_eq!(half.step_size(4), 8);
    }

    #[test]
    fn stepped_moves_by_step_and_clamps() {
        let range = VolumeRange::half_decibels(-92, -20).unwrap();
        assert_eq!(range.stepped(vol(50), StepDirection::Up, 4), 76);
        assert_eq!(range.stepped(vol(50), StepDirection::Down, 4), 60);
        assert_eq!(range.stepped(Volume::MAX, StepDirection::Up, 4), 140);
        assert_eq!(range.stepped(Volume::MIN, StepDirection::Down, 4), -4);
    }

    #[test]
    fn oversized_values_saturate_instead_of_overflowing() {
        let range = VolumeRange::half_decibels(-92, -20).unwrap();
        assert_eq!(range.step_size(1_500_000_000), i32::MAX);
        assert_eq!(range.stepped(vol(50), StepDirection::Up, 1_500_000_000), 140);
        assert_eq!(range.stepped(vol(50), StepDirection::Down, i32::MAX), -4);

        assert_eq!(
            VolumeRange::half_decibels(-92, i32::MAX),
            Err(ValueError::InvalidRange { min: -92, max: i32::MAX })
        );
    }
}
