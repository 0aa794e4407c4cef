// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response parsing for the device JSON API.
//!
//! These are wire records: they mirror the firmware's documents field for
//! field, with the firmware's defaults for anything left out. Conversion into
//! the bridge's own view happens in [`crate::state`].

mod capabilities;
mod info;
mod state;

pub use capabilities::{CapabilityList, FullDocument, PresetRecord, parse_presets};
pub use info::{InfoRecord, LedsRecord};
pub use state::{NightlightRecord, SegmentRecord, StateRecord, UdpSyncRecord, parse_post_reply};
