// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Nightlight (sleep timer) setting.

use std::fmt;

/// Nightlight state: a fade to black over a number of minutes.
///
/// # Examples
///
/// ```
/// use wled_bridge::types::Nightlight;
///
/// assert_eq!(Nightlight::from_minutes(0), Nightlight::Off);
/// assert_eq!(Nightlight::from_minutes(30).minutes(), 30);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nightlight {
    /// No timer running.
    #[default]
    Off,
    /// Timer running for this many minutes (1-255).
    Minutes(u8),
}

impl Nightlight {
    /// Creates a nightlight setting; zero minutes means off.
    #[must_use]
    pub const fn from_minutes(minutes: u8) -> Self {
        if minutes == 0 {
            Self::Off
        } else {
            Self::Minutes(minutes)
        }
    }

    /// Returns the duration in minutes, 0 when off.
    #[must_use]
    pub const fn minutes(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Minutes(m) => *m,
        }
    }

    /// Returns `true` if a timer is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Minutes(_))
    }
}

impl fmt::Display for Nightlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Minutes(m) => write!(f, "{m} min"),
        }
    }
}
