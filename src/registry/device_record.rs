// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One registry entry.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::response::{InfoRecord, StateRecord};
use crate::state::DeviceState;

/// Everything the bridge knows about one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    /// Unique, immutable name.
    pub name: String,
    /// `host` or `host:port`.
    pub address: String,
    /// Whether the last contact succeeded.
    pub online: bool,
    /// Time of the last successful contact.
    pub last_seen: Option<DateTime<Utc>>,
    /// MAC address, when the device reported one.
    pub mac: Option<String>,
    /// Registered by a network sweep rather than by configuration.
    pub discovered: bool,
    /// Last known state.
    pub state: DeviceState,
}

impl DeviceRecord {
    /// Creates a record for a device that has not been contacted yet.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            online: false,
            last_seen: None,
            mac: None,
            discovered: false,
            state: DeviceState::default(),
        }
    }
}

/// Result of writing a state document into a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateUpdate {
    /// The device was offline before this update.
    pub came_online: bool,
    /// The snapshot differs from the previous one.
    pub changed: bool,
}

/// A registry slot: the record plus the device's exclusive-access lock.
///
/// The record lock is synchronous and only held for single assignments, so
/// a caller that is cancelled mid-request never leaves a half-written
/// record behind. The busy lock is held across network calls.
#[derive(Debug)]
pub struct DeviceSlot {
    name: String,
    record: RwLock<DeviceRecord>,
    busy: Mutex<()>,
}

impl DeviceSlot {
    pub(crate) fn new(record: DeviceRecord) -> Self {
        Self {
            name: record.name.clone(),
            record: RwLock::new(record),
            busy: Mutex::new(()),
        }
    }

    /// Returns the device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy of the record.
    #[must_use]
    pub fn snapshot(&self) -> DeviceRecord {
        self.record.read().clone()
    }

    /// Returns the current address.
    #[must_use]
    pub fn address(&self) -> String {
        self.record.read().address.clone()
    }

    /// Returns `true` if the last contact succeeded.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.record.read().online
    }

    /// Returns the cached state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.record.read().state.clone()
    }

    /// Waits for exclusive access to the device.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.busy.lock().await
    }

    /// Takes exclusive access if nobody holds it.
    #[must_use]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, ()>> {
        self.busy.try_lock().ok()
    }

    /// Writes a state document read from the device.
    pub fn apply_state(&self, state: &StateRecord) -> StateUpdate {
        let mut record = self.record.write();
        let before = record.state.clone();
        record.state.update_from(state);

        let came_online = !record.online;
        record.online = true;
        record.last_seen = Some(Utc::now());

        StateUpdate {
            came_online,
            changed: record.state != before,
        }
    }

    /// Writes an info document read from the device.
    pub fn apply_info(&self, info: &InfoRecord) {
        let mut record = self.record.write();
        record.state.update_info(info);
        if let Some(mac) = info.mac() {
            record.mac = Some(mac.to_string());
        }
    }

    /// Marks the device reachable without changing its state.
    ///
    /// Returns `true` if it was offline.
    pub fn mark_online(&self) -> bool {
        let mut record = self.record.write();
        let was_offline = !record.online;
        record.online = true;
        record.last_seen = Some(Utc::now());
        was_offline
    }

    /// Marks the device unreachable. Returns `true` if it was online.
    pub fn mark_offline(&self) -> bool {
        let mut record = self.record.write();
        std::mem::replace(&mut record.online, false)
    }

    pub(crate) fn set_address(&self, address: &str) {
        self.record.write().address = address.to_string();
    }

    pub(crate) fn mac(&self) -> Option<String> {
        self.record.read().mac.clone()
    }

    pub(crate) fn is_discovered(&self) -> bool {
        self.record.read().discovered
    }
}
