// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Percentage type for brightness, speed and intensity.
//!
//! The host works in 0-100 while the firmware works in 0-255. This module
//! owns the conversion between the two so it happens in exactly one place.

use std::fmt;

use crate::error::ValueError;

/// A level expressed as a percentage (0-100).
///
/// # Examples
///
/// ```
/// use wled_bridge::types::Percent;
///
/// let level = Percent::new(75).unwrap();
/// assert_eq!(level.to_native(), 191);
/// assert_eq!(Percent::from_native(191), level);
///
/// assert!(Percent::new(101).is_err());
/// assert_eq!(Percent::clamped(150), Percent::MAX);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Percent(u8);

impl Percent {
    /// 0%.
    pub const MIN: Self = Self(0);

    /// 100%.
    pub const MAX: Self = Self(100);

    /// Creates a new percentage.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::OutOfRange` if value exceeds 100.
    pub fn new(value: u8) -> Result<Self, ValueError> {
        if value > 100 {
            return Err(ValueError::OutOfRange {
                min: 0,
                max: 100,
                actual: i64::from(value),
            });
        }
        Ok(Self(value))
    }

    /// Creates a percentage, clamping values above 100.
    #[must_use]
    pub const fn clamped(value: u8) -> Self {
        if value > 100 { Self(100) } else { Self(value) }
    }

    /// Returns the percentage value.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Converts to the firmware's 0-255 scale, rounding half up.
    #[must_use]
    pub fn to_native(self) -> u8 {
        let native = (u16::from(self.0) * 255 + 50) / 100;
        u8::try_from(native).unwrap_or(u8::MAX)
    }

    /// Converts from the firmware's 0-255 scale, rounding half up.
    #[must_use]
    pub fn from_native(native: u8) -> Self {
        let pct = (u16::from(native) * 100 + 127) / 255;
        Self::clamped(u8::try_from(pct).unwrap_or(100))
    }

    /// Returns this level raised by `step` points, saturating at 100.
    #[must_use]
    pub const fn saturating_add(self, step: u8) -> Self {
        Self::clamped(self.0.saturating_add(step))
    }

    /// Returns this level lowered by `step` points, saturating at 0.
    #[must_use]
    pub const fn saturating_sub(self, step: u8) -> Self {
        Self(self.0.saturating_sub(step))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl TryFrom<u8> for Percent {
    type Error = ValueError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
