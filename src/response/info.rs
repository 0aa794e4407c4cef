// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Info document parsing (`/json/info`).

use serde::{Deserialize, Serialize};

/// Static device information.
///
/// `ver` and `name` are optional here because a discovery probe must be able
/// to tell a controller apart from any other HTTP server that happens to
/// answer with JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoRecord {
    /// Firmware version string.
    pub ver: Option<String>,
    /// Firmware build id.
    pub vid: u32,
    /// LED hardware block.
    pub leds: LedsRecord,
    /// Friendly device name.
    pub name: Option<String>,
    /// UDP sync port.
    pub udpport: u16,
    /// MAC address, lowercase hex without separators.
    pub mac: String,
    /// IP address the device believes it has.
    pub ip: String,
    /// Product name.
    pub product: String,
    /// Brand name.
    pub brand: String,
}

impl Default for InfoRecord {
    fn default() -> Self {
        Self {
            ver: None,
            vid: 0,
            leds: LedsRecord::default(),
            name: None,
            udpport: 21324,
            mac: String::new(),
            ip: String::new(),
            product: "WLED".to_string(),
            brand: "wled".to_string(),
        }
    }
}

impl InfoRecord {
    /// Returns `true` if this looks like a controller's info document.
    #[must_use]
    pub fn is_controller(&self) -> bool {
        self.ver.as_deref().is_some_and(|v| !v.is_empty())
            && self.name.as_deref().is_some_and(|n| !n.is_empty())
    }

    /// Returns the firmware version, or an empty string.
    #[must_use]
    pub fn version(&self) -> &str {
        self.ver.as_deref().unwrap_or_default()
    }

    /// Returns the MAC address if the device reported one.
    #[must_use]
    pub fn mac(&self) -> Option<&str> {
        (!self.mac.is_empty()).then_some(self.mac.as_str())
    }
}

/// LED hardware block of the info document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedsRecord {
    /// Total LED count.
    pub count: u16,
    /// Maximum number of segments.
    pub maxseg: u8,
}
