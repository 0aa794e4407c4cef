// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device state cache.
//!
//! The registry maps device names to [`DeviceSlot`]s. Names are unique and
//! never change; addresses may change when a device is rediscovered at a new
//! IP. Polling never removes an entry for being unreachable; such devices are
//! only marked offline. A full refresh does fold entries that turn out to be
//! the same device (same MAC) into one.
//!
//! Lock order is registry map first, then slot record. Nothing takes the map
//! lock while holding a record lock.

mod device_record;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

pub use device_record::{DeviceRecord, DeviceSlot, StateUpdate};

use crate::error::{Error, Result};
use crate::response::InfoRecord;

/// What [`DeviceRegistry::merge_discovered`] did with a probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A device at this address was already known; its info was refreshed.
    Refreshed(String),
    /// A device with this MAC moved to a new address.
    Moved {
        /// Device name.
        name: String,
        /// Previous address.
        from: String,
    },
    /// A new device was registered under this name.
    Added(String),
}

impl MergeOutcome {
    /// Returns the name of the affected device.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Refreshed(name) | Self::Added(name) | Self::Moved { name, .. } => name,
        }
    }
}

/// Thread-safe table of known devices, ordered by name.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    slots: RwLock<BTreeMap<String, Arc<DeviceSlot>>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateDevice` if the name is taken.
    pub fn add(&self, name: &str, address: &str) -> Result<Arc<DeviceSlot>> {
        let mut slots = self.slots.write();
        if slots.contains_key(name) {
            return Err(Error::DuplicateDevice(name.to_string()));
        }
        let slot = Arc::new(DeviceSlot::new(DeviceRecord::new(name, address)));
        slots.insert(name.to_string(), Arc::clone(&slot));
        tracing::info!(device = %name, address = %address, "Device registered");
        Ok(slot)
    }

    /// Removes a device and returns its last record.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this name.
    pub fn remove(&self, name: &str) -> Result<DeviceRecord> {
        let slot = self
            .slots
            .write()
            .remove(name)
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?;
        tracing::info!(device = %name, "Device removed");
        Ok(slot.snapshot())
    }

    /// Returns the slot for a device.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<DeviceSlot>> {
        self.slots.read().get(name).cloned()
    }

    /// Returns the slot for a device.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this name.
    pub fn require(&self, name: &str) -> Result<Arc<DeviceSlot>> {
        self.get(name)
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))
    }

    /// Returns every slot in name order.
    #[must_use]
    pub fn slots(&self) -> Vec<Arc<DeviceSlot>> {
        self.slots.read().values().cloned().collect()
    }

    /// Returns every device name in order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.slots.read().keys().cloned().collect()
    }

    /// Returns a copy of every record in name order.
    #[must_use]
    pub fn records(&self) -> Vec<DeviceRecord> {
        self.slots().iter().map(|s| s.snapshot()).collect()
    }

    /// Returns the number of devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Returns `true` if no device is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Folds a successful discovery probe into the registry.
    ///
    /// A device already registered at `address` has its info refreshed. A
    /// device with the same MAC at another address is moved to `address`.
    /// Anything else is added under the firmware-reported name, or a name
    /// derived from the address, with a numeric suffix if taken.
    pub fn merge_discovered(&self, address: &str, info: &InfoRecord) -> MergeOutcome {
        let mut slots = self.slots.write();

        if let Some(slot) = slots.values().find(|s| s.address() == address) {
            slot.apply_info(info);
            slot.mark_online();
            return MergeOutcome::Refreshed(slot.name().to_string());
        }

        if let Some(mac) = info.mac() {
            if let Some(slot) = slots.values().find(|s| s.mac().as_deref() == Some(mac)) {
                let from = slot.address();
                tracing::info!(
                    device = %slot.name(),
                    from = %from,
                    to = %address,
                    "Device moved to a new address"
                );
                slot.set_address(address);
                slot.apply_info(info);
                slot.mark_online();
                return MergeOutcome::Moved {
                    name: slot.name().to_string(),
                    from,
                };
            }
        }

        let base = info
            .name
            .as_deref()
            .map(sanitize_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| name_from_address(address));
        let name = unique_name(&base, |candidate| slots.contains_key(candidate));

        let mut record = DeviceRecord::new(&name, address);
        record.discovered = true;
        let slot = Arc::new(DeviceSlot::new(record));
        slot.apply_info(info);
        slot.mark_online();
        slots.insert(name.clone(), slot);
        tracing::info!(device = %name, address = %address, "Discovered new device");

        MergeOutcome::Added(name)
    }

    /// Removes entries that report the MAC of another entry and returns them.
    ///
    /// Of each group sharing a MAC, a configured entry is kept over a
    /// discovered one, then the first name in order.
    pub fn fold_shared_macs(&self) -> Vec<DeviceRecord> {
        let mut slots = self.slots.write();

        let mut keepers: BTreeMap<String, (String, bool)> = BTreeMap::new();
        let mut duplicates = Vec::new();
        for slot in slots.values() {
            let Some(mac) = slot.mac() else { continue };
            let candidate = (slot.name().to_string(), slot.is_discovered());
            match keepers.get_mut(&mac) {
                None => {
                    keepers.insert(mac, candidate);
                }
                Some(kept) if kept.1 && !candidate.1 => {
                    duplicates.push(std::mem::replace(kept, candidate).0);
                }
                Some(_) => duplicates.push(candidate.0),
            }
        }

        duplicates
            .into_iter()
            .filter_map(|name| slots.remove(&name))
            .map(|slot| {
                let record = slot.snapshot();
                tracing::info!(
                    device = %record.name,
                    address = %record.address,
                    "Removed entry for a device registered twice"
                );
                record
            })
            .collect()
    }
}

/// Cleans a firmware-reported name: trims it, strips `.local`, and turns
/// dots into underscores.
#[must_use]
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".local").unwrap_or(trimmed);
    trimmed.replace('.', "_")
}

/// Derives a device name from an address (`192.168.1.5` becomes
/// `192_168_1_5`).
#[must_use]
pub fn name_from_address(address: &str) -> String {
    address.trim().replace(['.', ':'], "_")
}

/// Returns `base`, or `base_2`, `base_3`, ... whichever is not taken.
fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2u32..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
