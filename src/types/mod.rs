// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for device control.
//!
//! Each type keeps its value inside the range the host works with, so the
//! command translator never has to re-check it.
//!
//! # Types
//!
//! - [`Percent`] - Brightness, speed and intensity (0-100%)
//! - [`RgbColor`] - Primary segment color
//! - [`TransitionTime`] - Crossfade duration in 100 ms units (0-255)
//! - [`Nightlight`] - Sleep timer, off or a number of minutes
//! - [`SyncMode`] - UDP sync broadcast on/off

mod nightlight;
mod percent;
mod rgb_color;
mod sync_mode;
mod transition;

pub use nightlight::Nightlight;
pub use percent::Percent;
pub use rgb_color::RgbColor;
pub use sync_mode::SyncMode;
pub use transition::TransitionTime;
