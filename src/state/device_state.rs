// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshot in host units.

use serde::Serialize;

use crate::response::{InfoRecord, StateRecord};
use crate::types::{Nightlight, Percent, RgbColor, SyncMode, TransitionTime};

/// Last known state of one device, in the units the host works with.
///
/// Percentages are 0-100 (the firmware's 0-255 values are rescaled on the
/// way in). Segment fields come from the main segment.
///
/// # Examples
///
/// ```
/// use wled_bridge::response::StateRecord;
/// use wled_bridge::state::DeviceState;
///
/// let record: StateRecord = serde_json::from_str(r#"{"on":true,"bri":191}"#).unwrap();
/// let state = DeviceState::from_record(&record);
/// assert!(state.power);
/// assert_eq!(state.brightness.value(), 75);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    /// Master power.
    pub power: bool,
    /// Master brightness.
    pub brightness: Percent,
    /// Effect code on the main segment.
    pub effect: u16,
    /// Palette code on the main segment.
    pub palette: u16,
    /// Active preset.
    pub preset: Option<u16>,
    /// Active playlist.
    pub playlist: Option<u16>,
    /// Primary color of the main segment.
    pub color: Option<RgbColor>,
    /// Effect speed.
    pub speed: Percent,
    /// Effect intensity.
    pub intensity: Percent,
    /// Crossfade time.
    pub transition: TransitionTime,
    /// Sleep timer.
    pub nightlight: Nightlight,
    /// UDP sync broadcast.
    pub sync: SyncMode,
    /// Live data override active.
    pub live_override: bool,
    /// Index of the main segment.
    pub main_segment: u8,
    /// Total LED count.
    pub led_count: u16,
    /// Firmware version.
    pub firmware: String,
}

impl DeviceState {
    /// Builds a snapshot from a state document. Info fields stay empty.
    #[must_use]
    pub fn from_record(record: &StateRecord) -> Self {
        let mut state = Self::default();
        state.update_from(record);
        state
    }

    /// Replaces the live fields with those of a state document.
    ///
    /// LED count and firmware version are kept.
    pub fn update_from(&mut self, record: &StateRecord) {
        let main = record.main_segment();

        self.power = record.on;
        self.brightness = Percent::from_native(record.bri);
        self.preset = record.preset();
        self.playlist = record.playlist();
        self.transition = TransitionTime::clamped(record.transition);
        self.nightlight = if record.nl.on {
            Nightlight::from_minutes(record.nl.dur)
        } else {
            Nightlight::Off
        };
        self.sync = SyncMode::from(record.udpn.send);
        self.live_override = record.lor > 0;
        self.main_segment = main.map_or(record.mainseg, |s| s.id);

        if let Some(seg) = main {
            self.effect = seg.fx;
            self.palette = seg.pal;
            self.color = seg.primary_color();
            self.speed = Percent::from_native(seg.sx);
            self.intensity = Percent::from_native(seg.ix);
        }
    }

    /// Replaces the static fields with those of an info document.
    pub fn update_info(&mut self, info: &InfoRecord) {
        self.led_count = info.leds.count;
        self.firmware = info.version().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> StateRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn rescales_native_values() {
        let state = DeviceState::from_record(&record(
            r#"{"on":true,"bri":255,"seg":[{"id":0,"sx":0,"ix":128}]}"#,
        ));
        assert_eq!(state.brightness, Percent::MAX);
        assert_eq!(state.speed, Percent::MIN);
        assert_eq!(state.intensity.value(), 50);
    }

    #[test]
    fn nightlight_reads_duration_only_when_running() {
        let running = DeviceState::from_record(&record(r#"{"nl":{"on":true,"dur":20}}"#));
        assert_eq!(running.nightlight, Nightlight::Minutes(20));

        let idle = DeviceState::from_record(&record(r#"{"nl":{"on":false,"dur":20}}"#));
        assert_eq!(idle.nightlight, Nightlight::Off);
    }

    #[test]
    fn update_keeps_info_fields() {
        let mut state = DeviceState::default();
        let info: InfoRecord =
            serde_json::from_str(r#"{"ver":"0.15.0","name":"x","leds":{"count":144}}"#).unwrap();
        state.update_info(&info);
        state.update_from(&record(r#"{"on":true}"#));

        assert!(state.power);
        assert_eq!(state.led_count, 144);
        assert_eq!(state.firmware, "0.15.0");
    }

    #[test]
    fn segment_fields_come_from_main_segment() {
        let state = DeviceState::from_record(&record(
            r#"{"mainseg":1,"seg":[{"id":0,"fx":1},{"id":1,"fx":7,"pal":3,"col":[[0,0,255]]}]}"#,
        ));
        assert_eq!(state.main_segment, 1);
        assert_eq!(state.effect, 7);
        assert_eq!(state.palette, 3);
        assert_eq!(state.color, Some(RgbColor::new(0, 0, 255)));
    }

    #[test]
    fn live_override_and_sync_flags() {
        let state = DeviceState::from_record(&record(r#"{"lor":2,"udpn":{"send":true}}"#));
        assert!(state.live_override);
        assert_eq!(state.sync, SyncMode::Send);
    }
}
