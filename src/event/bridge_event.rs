// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge event types.

use serde::Serialize;

use crate::catalog::RebuildReport;
use crate::state::DeviceState;

/// Events emitted by the bridge.
///
/// Hosts subscribe to these to keep their own status model in step with the
/// device table. Events are only emitted when something actually changed.
///
/// # Examples
///
/// ```
/// use wled_bridge::event::BridgeEvent;
///
/// let event = BridgeEvent::device_added("kitchen");
/// assert_eq!(event.device(), Some("kitchen"));
/// assert!(event.is_lifecycle());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// A device was registered.
    DeviceAdded {
        /// Device name.
        device: String,
    },

    /// A device was removed by reconfiguration.
    DeviceRemoved {
        /// Device name.
        device: String,
    },

    /// A device became reachable or unreachable.
    OnlineChanged {
        /// Device name.
        device: String,
        /// New reachability.
        online: bool,
    },

    /// A device's cached state changed after a poll or a command.
    StateChanged {
        /// Device name.
        device: String,
        /// The complete new state.
        state: Box<DeviceState>,
    },

    /// The metadata catalog was rebuilt.
    CatalogRebuilt {
        /// Effects in the merged catalog.
        effects: usize,
        /// Palettes in the merged catalog.
        palettes: usize,
        /// Presets in the merged catalog.
        presets: usize,
        /// Conflicting labels recorded.
        conflicts: usize,
    },
}

impl BridgeEvent {
    /// Returns the device this event is about, if any.
    #[must_use]
    pub fn device(&self) -> Option<&str> {
        match self {
            Self::DeviceAdded { device }
            | Self::DeviceRemoved { device }
            | Self::OnlineChanged { device, .. }
            | Self::StateChanged { device, .. } => Some(device),
            Self::CatalogRebuilt { .. } => None,
        }
    }

    /// Returns `true` if this is a device lifecycle event (added/removed).
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        matches!(self, Self::DeviceAdded { .. } | Self::DeviceRemoved { .. })
    }

    /// Creates a device added event.
    #[must_use]
    pub fn device_added(device: impl Into<String>) -> Self {
        Self::DeviceAdded {
            device: device.into(),
        }
    }

    /// Creates a device removed event.
    #[must_use]
    pub fn device_removed(device: impl Into<String>) -> Self {
        Self::DeviceRemoved {
            device: device.into(),
        }
    }

    /// Creates a reachability event.
    #[must_use]
    pub fn online_changed(device: impl Into<String>, online: bool) -> Self {
        Self::OnlineChanged {
            device: device.into(),
            online,
        }
    }

    /// Creates a state change event.
    #[must_use]
    pub fn state_changed(device: impl Into<String>, state: DeviceState) -> Self {
        Self::StateChanged {
            device: device.into(),
            state: Box::new(state),
        }
    }

    /// Creates a catalog event from a rebuild's totals.
    #[must_use]
    pub fn catalog_rebuilt(report: &RebuildReport) -> Self {
        Self::CatalogRebuilt {
            effects: report.effects,
            palettes: report.palettes,
            presets: report.presets,
            conflicts: report.conflicts,
        }
    }
}
