// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State document parsing (`/json/state`).

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::RgbColor;

/// Live state document as reported by the firmware.
///
/// Every field is optional on the wire; absent fields take the firmware's
/// own defaults.
///
/// # Examples
///
/// ```
/// use wled_bridge::response::StateRecord;
///
/// let json = r#"{"on":true,"bri":128,"ps":-1,"seg":[{"id":0,"fx":9,"col":[[255,0,0]]}]}"#;
/// let state: StateRecord = serde_json::from_str(json).unwrap();
/// assert!(state.on);
/// assert_eq!(state.preset(), None);
/// assert_eq!(state.main_segment().unwrap().fx, 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateRecord {
    /// Master power.
    pub on: bool,
    /// Master brightness (0-255).
    pub bri: u8,
    /// Crossfade time in 100 ms units.
    pub transition: u16,
    /// Active preset, -1 or 0 when none.
    pub ps: i16,
    /// Active playlist, -1 or 0 when none.
    pub pl: i16,
    /// Nightlight settings.
    pub nl: NightlightRecord,
    /// UDP sync flags.
    pub udpn: UdpSyncRecord,
    /// Live data override (0 off, 1 until live ends, 2 until reboot).
    pub lor: u8,
    /// Index of the main segment.
    pub mainseg: u8,
    /// Segments.
    pub seg: Vec<SegmentRecord>,
}

impl Default for StateRecord {
    fn default() -> Self {
        Self {
            on: false,
            bri: 0,
            transition: 7,
            ps: -1,
            pl: -1,
            nl: NightlightRecord::default(),
            udpn: UdpSyncRecord::default(),
            lor: 0,
            mainseg: 0,
            seg: Vec::new(),
        }
    }
}

impl StateRecord {
    /// Returns the main segment, or the first segment if `mainseg` does not
    /// match any segment id.
    #[must_use]
    pub fn main_segment(&self) -> Option<&SegmentRecord> {
        self.seg
            .iter()
            .find(|s| s.id == self.mainseg)
            .or_else(|| self.seg.first())
    }

    /// Returns the active preset, if any.
    #[must_use]
    pub fn preset(&self) -> Option<u16> {
        positive_code(self.ps)
    }

    /// Returns the active playlist, if any.
    #[must_use]
    pub fn playlist(&self) -> Option<u16> {
        positive_code(self.pl)
    }
}

fn positive_code(raw: i16) -> Option<u16> {
    u16::try_from(raw).ok().filter(|code| *code > 0)
}

/// Nightlight block of the state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NightlightRecord {
    /// Whether the timer is running.
    pub on: bool,
    /// Duration in minutes.
    pub dur: u8,
    /// Fade mode (0 instant, 1 fade, 2 color fade, 3 sunrise).
    pub mode: u8,
    /// Target brightness.
    pub tbri: u8,
}

impl Default for NightlightRecord {
    fn default() -> Self {
        Self {
            on: false,
            dur: 60,
            mode: 0,
            tbri: 0,
        }
    }
}

/// UDP sync block of the state document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpSyncRecord {
    /// Broadcast changes.
    pub send: bool,
    /// Accept broadcasts.
    pub recv: bool,
}

impl Default for UdpSyncRecord {
    fn default() -> Self {
        Self {
            send: false,
            recv: true,
        }
    }
}

/// One LED segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentRecord {
    /// Segment id.
    pub id: u8,
    /// First LED.
    pub start: u16,
    /// One past the last LED.
    pub stop: u16,
    /// Length in LEDs.
    pub len: u16,
    /// Segment power.
    pub on: bool,
    /// Segment brightness (0-255).
    pub bri: u8,
    /// Effect code.
    pub fx: u16,
    /// Effect speed (0-255).
    pub sx: u8,
    /// Effect intensity (0-255).
    pub ix: u8,
    /// Palette code.
    pub pal: u16,
    /// Color slots. Either `[r,g,b(,w)]` arrays or hex strings depending on
    /// firmware settings.
    pub col: Vec<serde_json::Value>,
}

impl Default for SegmentRecord {
    fn default() -> Self {
        Self {
            id: 0,
            start: 0,
            stop: 0,
            len: 0,
            on: true,
            bri: 255,
            fx: 0,
            sx: 128,
            ix: 128,
            pal: 0,
            col: Vec::new(),
        }
    }
}

impl SegmentRecord {
    /// Returns the first color slot, if it can be read.
    #[must_use]
    pub fn primary_color(&self) -> Option<RgbColor> {
        let slot = self.col.first()?;
        match slot {
            serde_json::Value::String(hex) => RgbColor::from_hex(hex).ok(),
            other => RgbColor::deserialize(other).ok(),
        }
    }
}

/// Parses the body of a `POST /json/state` reply.
///
/// With `"v": true` in the request the firmware echoes the full state.
/// Older builds only acknowledge with `{"success": true}`, which yields
/// `None`.
///
/// # Errors
///
/// Returns `ProtocolError::Rejected` for `{"success": false}` and
/// `ProtocolError::Malformed` if the body is not a state document.
pub fn parse_post_reply(body: &[u8]) -> Result<Option<StateRecord>, ProtocolError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;

    if let Some(success) = value.get("success") {
        if success.as_bool() == Some(false) {
            return Err(ProtocolError::Rejected);
        }
        if value.get("on").is_none() {
            return Ok(None);
        }
    }

    if !value.is_object() {
        return Err(ProtocolError::MissingField("on"));
    }

    Ok(Some(StateRecord::deserialize(value)?))
}
