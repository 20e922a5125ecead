// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for NAD receiver control.
//!
//! # Types
//!
//! - [`Volume`] - Normalized volume (0-100%)
//! - [`VolumeRange`] - A receiver's native volume scale, with conversions
//! - [`SourceMap`] - Numeric source code to display name table
//! - [`SourceSelector`] - A source resolved for the wire

mod source;
mod volume;
mod volume_range;

pub use source::{SourceMap, SourceSelector};
pub use volume::{StepDirection, Volume};
pub use volume_range::{NativeUnit, VolumeRange, native_to_percent, percent_to_native};
