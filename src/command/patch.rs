// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Partial state documents sent with `POST /json/state`.

use serde::Serialize;

use crate::types::RgbColor;

/// A partial state document.
///
/// Only fields that are set are serialized. Every patch asks the firmware to
/// echo the resulting full state (`"v": true`).
///
/// # Examples
///
/// ```
/// use wled_bridge::command::StatePatch;
///
/// let patch = StatePatch::new().with_on(true).with_bri(191);
/// assert_eq!(
///     serde_json::to_string(&patch).unwrap(),
///     r#"{"on":true,"bri":191,"v":true}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatePatch {
    /// Master power.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    /// Master brightness (0-255).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    /// Crossfade time in 100 ms units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<u16>,
    /// Preset to load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps: Option<u16>,
    /// Playlist to start, or -1 to stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pl: Option<i16>,
    /// Nightlight settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nl: Option<NightlightPatch>,
    /// UDP sync settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udpn: Option<UdpSyncPatch>,
    /// Live data override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lor: Option<u8>,
    /// Segment changes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seg: Vec<SegmentPatch>,
    v: bool,
}

impl Default for StatePatch {
    fn default() -> Self {
        Self {
            on: None,
            bri: None,
            transition: None,
            ps: None,
            pl: None,
            nl: None,
            udpn: None,
            lor: None,
            seg: Vec::new(),
            v: true,
        }
    }
}

impl StatePatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets master power.
    #[must_use]
    pub fn with_on(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    /// Sets master brightness in native units.
    #[must_use]
    pub fn with_bri(mut self, bri: u8) -> Self {
        self.bri = Some(bri);
        self
    }

    /// Sets the crossfade time.
    #[must_use]
    pub fn with_transition(mut self, transition: u16) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Adds a segment change.
    #[must_use]
    pub fn with_segment(mut self, segment: SegmentPatch) -> Self {
        self.seg.push(segment);
        self
    }

    /// Returns `true` if nothing but the echo request would be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Changes to one segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentPatch {
    /// Segment id.
    pub id: u8,
    /// Effect code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fx: Option<u16>,
    /// Palette code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pal: Option<u16>,
    /// Effect speed (0-255).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sx: Option<u8>,
    /// Effect intensity (0-255).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ix: Option<u8>,
    /// Color slots, primary first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<Vec<RgbColor>>,
}

impl SegmentPatch {
    /// Creates an empty change for segment `id`.
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Nightlight changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NightlightPatch {
    /// Timer running.
    pub on: bool,
    /// Duration in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dur: Option<u8>,
    /// Fade mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u8>,
    /// Target brightness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tbri: Option<u8>,
}

/// UDP sync changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UdpSyncPatch {
    /// Broadcast changes.
    pub send: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_only_requests_echo() {
        let patch = StatePatch::new();
        assert!(patch.is_empty());
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"v":true}"#);
    }

    #[test]
    fn segment_patch_serializes_color_triples() {
        let mut seg = SegmentPatch::new(2);
        seg.col = Some(vec![RgbColor::new(255, 0, 0)]);
        let patch = StatePatch::new().with_segment(seg);

        assert!(!patch.is_empty());
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"seg":[{"id":2,"col":[[255,0,0]]}],"v":true}"#
        );
    }

    #[test]
    fn nightlight_patch_serialization() {
        let patch = StatePatch {
            nl: Some(NightlightPatch {
                on: false,
                ..NightlightPatch::default()
            }),
            ..StatePatch::default()
        };
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"nl":{"on":false},"v":true}"#
        );
    }
}
