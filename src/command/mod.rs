// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Domain commands and their translation into state patches.
//!
//! Every [`Command`] becomes exactly one [`StatePatch`]. Translation is pure:
//! it looks at the cached [`DeviceState`](crate::state::DeviceState) and the
//! device's [`MetadataCatalog`](crate::catalog::MetadataCatalog) but never
//! touches the network.
//!
//! | Command | Pushed fields |
//! |---------|---------------|
//! | [`Command::On`] | `on`, optionally `bri` |
//! | [`Command::Off`] | `on` |
//! | [`Command::FastOn`] / [`Command::FastOff`] | `on`, `transition: 0` |
//! | [`Command::Brighten`] / [`Command::Dim`] | `bri` |
//! | [`Command::SetBrightness`] | `bri` |
//! | [`Command::SetEffect`] / [`Command::SetPalette`] | `seg[main].fx` / `seg[main].pal` |
//! | [`Command::LoadPreset`] | `ps` |
//! | [`Command::SetColor`] | `seg[main].col` |
//! | [`Command::SetSpeed`] / [`Command::SetIntensity`] | `seg[main].sx` / `seg[main].ix` |
//! | [`Command::SetTransition`] | `transition` |
//! | [`Command::Nightlight`] | `on`, `nl` |
//! | [`Command::NightlightOff`] | `nl` |
//! | [`Command::SetSync`] | `udpn.send` |
//! | [`Command::SetLiveOverride`] | `lor` |
//! | [`Command::StartPlaylist`] / [`Command::StopPlaylist`] | `pl` |
//!
//! # Examples
//!
//! ```
//! use wled_bridge::catalog::MetadataCatalog;
//! use wled_bridge::command::{Command, translate};
//! use wled_bridge::state::DeviceState;
//!
//! let patch = translate(
//!     &Command::On { brightness: Some(75) },
//!     &DeviceState::default(),
//!     &MetadataCatalog::new(),
//! )
//! .unwrap();
//!
//! assert_eq!(patch.on, Some(true));
//! assert_eq!(patch.bri, Some(191));
//! ```

mod patch;
mod translate;

use std::fmt;

pub use patch::{NightlightPatch, SegmentPatch, StatePatch, UdpSyncPatch};
pub use translate::{BRIGHTNESS_STEP, translate};

use crate::types::{RgbColor, SyncMode};

/// A host command for one device.
///
/// Percentages are 0-100 and clamped; codes are checked against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Power on, optionally at a brightness.
    On {
        /// Brightness percentage.
        brightness: Option<u8>,
    },
    /// Power off.
    Off,
    /// Power on without a crossfade.
    FastOn,
    /// Power off without a crossfade.
    FastOff,
    /// Raise brightness by [`BRIGHTNESS_STEP`] points.
    Brighten,
    /// Lower brightness by [`BRIGHTNESS_STEP`] points.
    Dim,
    /// Set brightness percentage.
    SetBrightness(u8),
    /// Select an effect on the main segment.
    SetEffect(u16),
    /// Select a palette on the main segment.
    SetPalette(u16),
    /// Load a stored preset.
    LoadPreset(u16),
    /// Set the primary color of the main segment.
    SetColor(RgbColor),
    /// Set effect speed percentage.
    SetSpeed(u8),
    /// Set effect intensity percentage.
    SetIntensity(u8),
    /// Set crossfade time in 100 ms units.
    SetTransition(u16),
    /// Power on and fade out over this many minutes; 0 cancels.
    Nightlight(u8),
    /// Cancel the nightlight timer.
    NightlightOff,
    /// Enable or disable UDP sync broadcast.
    SetSync(SyncMode),
    /// Let the host override incoming live data.
    SetLiveOverride(bool),
    /// Start a playlist.
    StartPlaylist(u16),
    /// Stop the running playlist.
    StopPlaylist,
}

impl Command {
    /// Returns a short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::On { .. } => "on",
            Self::Off => "off",
            Self::FastOn => "fast_on",
            Self::FastOff => "fast_off",
            Self::Brighten => "brighten",
            Self::Dim => "dim",
            Self::SetBrightness(_) => "set_brightness",
            Self::SetEffect(_) => "set_effect",
            Self::SetPalette(_) => "set_palette",
            Self::LoadPreset(_) => "load_preset",
            Self::SetColor(_) => "set_color",
            Self::SetSpeed(_) => "set_speed",
            Self::SetIntensity(_) => "set_intensity",
            Self::SetTransition(_) => "set_transition",
            Self::Nightlight(_) => "nightlight",
            Self::NightlightOff => "nightlight_off",
            Self::SetSync(_) => "set_sync",
            Self::SetLiveOverride(_) => "set_live_override",
            Self::StartPlaylist(_) => "start_playlist",
            Self::StopPlaylist => "stop_playlist",
        }
    }

    /// Returns `true` if the device needs time to apply the command before
    /// its state can be read back.
    #[must_use]
    pub const fn needs_settle(&self) -> bool {
        matches!(self, Self::LoadPreset(_))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On {
                brightness: Some(b),
            } => write!(f, "on ({b}%)"),
            Self::SetBrightness(v) | Self::SetSpeed(v) | Self::SetIntensity(v) => {
                write!(f, "{} {v}%", self.name())
            }
            Self::SetEffect(code)
            | Self::SetPalette(code)
            | Self::LoadPreset(code)
            | Self::StartPlaylist(code)
            | Self::SetTransition(code) => write!(f, "{} {code}", self.name()),
            Self::SetColor(color) => write!(f, "set_color {color}"),
            Self::Nightlight(minutes) => write!(f, "nightlight {minutes} min"),
            Self::SetSync(mode) => write!(f, "set_sync {mode}"),
            Self::SetLiveOverride(enabled) => write!(f, "set_live_override {enabled}"),
            _ => f.write_str(self.name()),
        }
    }
}
