// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UDP sync mode.

use std::fmt;

/// Whether the device broadcasts its state changes to other controllers.
///
/// Only the send side is controllable. The firmware does not persist the
/// receive flag across reboots, so it is not exposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Not broadcasting.
    #[default]
    Off,
    /// Broadcasting state changes.
    Send,
}

impl SyncMode {
    /// Returns the value of the `udpn.send` flag for this mode.
    #[must_use]
    pub const fn sends(&self) -> bool {
        matches!(self, Self::Send)
    }
}

impl From<bool> for SyncMode {
    fn from(send: bool) -> Self {
        if send { Self::Send } else { Self::Off }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Send => f.write_str("send"),
        }
    }
}
