// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RGB color type with hex parsing.
//!
//! Segment colors travel over the wire as `[r, g, b]` triples (some firmware
//! builds append a white channel, which is ignored here).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValueError;

/// RGB color with 8-bit channels (0-255).
///
/// # Examples
///
/// ```
/// use wled_bridge::types::RgbColor;
///
/// let orange = RgbColor::new(255, 128, 0);
/// assert_eq!(orange.to_hex(), "FF8000");
///
/// let red = RgbColor::from_hex("#F00").unwrap();
/// assert_eq!(red, RgbColor::new(255, 0, 0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RgbColor {
    red: u8,
    green: u8,
    blue: u8,
}

impl RgbColor {
    /// Creates a new RGB color.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parses an RGB color from a hex string.
    ///
    /// Accepts `#RRGGBB`, `RRGGBB`, `#RGB` and `RGB`. An eight-digit
    /// `RRGGBBWW` form is accepted too; its white byte is dropped.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidHexColor` if the string is not one of the
    /// accepted forms.
    pub fn from_hex(hex: &str) -> Result<Self, ValueError> {
        let digits = hex.trim_start_matches('#');
        let invalid = || ValueError::InvalidHexColor(hex.to_string());

        if !digits.is_ascii() {
            return Err(invalid());
        }

        match digits.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (slot, c) in channels.iter_mut().zip(digits.chars()) {
                    let nibble = c.to_digit(16).ok_or_else(invalid)?;
                    // 0xF expands to 0xFF
                    *slot = u8::try_from(nibble * 17).map_err(|_| invalid())?;
                }
                Ok(Self::new(channels[0], channels[1], channels[2]))
            }
            6 | 8 => {
                let pair = |range: std::ops::Range<usize>| {
                    u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
                };
                if digits.len() == 8 {
                    pair(6..8)?;
                }
                Ok(Self::new(pair(0..2)?, pair(2..4)?, pair(4..6)?))
            }
            _ => Err(invalid()),
        }
    }

    /// Returns the red component.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.red
    }

    /// Returns the green component.
    #[must_use]
    pub const fn green(&self) -> u8 {
        self.green
    }

    /// Returns the blue component.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        self.blue
    }

    /// Returns the color as a hex string without the hash prefix.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    /// Returns the color as the `[r, g, b]` triple the firmware expects.
    #[must_use]
    pub const fn to_array(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl FromStr for RgbColor {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<(u8, u8, u8)> for RgbColor {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        Self::new(red, green, blue)
    }
}

impl Serialize for RgbColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RgbColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Extra channels (white, CCT) are dropped.
        let channels = Vec::<u8>::deserialize(deserializer)?;
        match channels.as_slice() {
            [r, g, b, ..] => Ok(Self::new(*r, *g, *b)),
            _ => Err(serde::de::Error::invalid_length(
                channels.len(),
                &"at least 3 color channels",
            )),
        }
    }
}
