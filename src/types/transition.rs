// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transition time for state changes.

use std::fmt;
use std::time::Duration;

/// Crossfade duration in units of 100 ms (0-255).
///
/// Zero switches instantly. The firmware accepts larger values, but the
/// host-facing range is capped at 255 (25.5 s).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wled_bridge::types::TransitionTime;
///
/// let t = TransitionTime::clamped(7);
/// assert_eq!(t.as_duration(), Duration::from_millis(700));
/// assert_eq!(TransitionTime::clamped(1000).value(), 255);
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
pub struct TransitionTime(u8);

impl TransitionTime {
    /// Instant switch.
    pub const INSTANT: Self = Self(0);

    /// Firmware default (700 ms).
    pub const DEFAULT: Self = Self(7);

    /// Creates a transition time, clamping to 0-255.
    #[must_use]
    pub fn clamped(units: u16) -> Self {
        Self(u8::try_from(units).unwrap_or(u8::MAX))
    }

    /// Returns the value in 100 ms units.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// Returns the transition as a [`Duration`].
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.0) * 100)
    }
}

impl fmt::Display for TransitionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}s", self.0 / 10, self.0 % 10)
    }
}
