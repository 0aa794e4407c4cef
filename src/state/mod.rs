// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state snapshots.
//!
//! [`DeviceState`] is what the cache stores for each device, in host units.
//! [`DeviceStatus`] is the same snapshot with catalog codes resolved to
//! labels, ready for display.
//!
//! # Examples
//!
//! ```
//! use wled_bridge::catalog::MetadataCatalog;
//! use wled_bridge::registry::DeviceRecord;
//! use wled_bridge::state::DeviceStatus;
//!
//! let record = DeviceRecord::new("kitchen", "10.0.0.2");
//! let status = DeviceStatus::resolve(&record, &MetadataCatalog::new());
//!
//! assert_eq!(status.effect, "0");
//! assert!(!status.online);
//! ```

mod device_state;
mod status;

pub use device_state::DeviceState;
pub use status::DeviceStatus;
