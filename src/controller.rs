// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device command execution and polling.
//!
//! A command goes through these steps, and stops at the first that fails:
//!
//! 1. look the device up (`DeviceNotFound`);
//! 2. take the device's exclusive lock;
//! 3. refuse devices known to be offline (`DeviceOffline`, no request made);
//! 4. translate and validate against the device's catalog
//!    (`InvalidParameter`, no request made);
//! 5. send one state patch;
//! 6. read the state back and write the device's answer into the cache.
//!
//! A transport failure in step 5 or 6 marks the device offline. A protocol
//! failure is returned as is and leaves the cache untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::catalog::{CatalogSet, EffectTagRules, RebuildReport, rebuild};
use crate::command::{Command, translate};
use crate::error::{ApiError, Error, Result};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::DeviceApi;
use crate::registry::{DeviceRegistry, DeviceSlot};
use crate::response::StateRecord;
use crate::state::DeviceState;

/// How much a poll reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RefreshKind {
    /// Live state only.
    Light,
    /// Live state and device info.
    Full,
}

/// What happened to one device during a poll.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// The device answered. `changed` tells whether the cache moved.
    Updated {
        /// The cached snapshot changed.
        changed: bool,
    },
    /// A command held the device; it was left alone.
    Skipped,
    /// The device did not answer and is now marked offline.
    Offline,
    /// The device answered with something unusable.
    Failed(Error),
}

/// Totals for one polling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    /// Devices that answered.
    pub updated: usize,
    /// Devices whose snapshot changed.
    pub changed: usize,
    /// Devices skipped because a command held them.
    pub skipped: usize,
    /// Devices that did not answer.
    pub offline: usize,
    /// Devices that answered with something unusable.
    pub failed: usize,
    /// Duplicate entries removed because they share a MAC with another.
    pub folded: usize,
}

/// Shared context for talking to devices.
///
/// Cheap to clone; every clone works on the same registry, catalog and
/// event bus.
#[derive(Debug, Clone)]
pub struct DeviceController<A> {
    api: A,
    registry: Arc<DeviceRegistry>,
    catalog: Arc<RwLock<CatalogSet>>,
    events: EventBus,
    request_timeout: Duration,
    settle: Duration,
    rebuilding: Arc<Mutex<()>>,
}

impl<A: DeviceApi> DeviceController<A> {
    /// Creates a controller.
    pub(crate) fn new(
        api: A,
        registry: Arc<DeviceRegistry>,
        catalog: Arc<RwLock<CatalogSet>>,
        events: EventBus,
    ) -> Self {
        Self {
            api,
            registry,
            catalog,
            events,
            request_timeout: Duration::from_secs(3),
            settle: Duration::from_millis(300),
            rebuilding: Arc::new(Mutex::new(())),
        }
    }

    /// Sets the upper bound for any single device call.
    #[must_use]
    pub(crate) fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long to wait after loading a preset before reading back.
    #[must_use]
    pub(crate) fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub(crate) fn api(&self) -> &A {
        &self.api
    }

    pub(crate) fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub(crate) fn catalog(&self) -> &Arc<RwLock<CatalogSet>> {
        &self.catalog
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }

    /// Runs one command against one device and returns the confirmed state.
    ///
    /// # Errors
    ///
    /// - `Error::DeviceNotFound` if `name` is not registered
    /// - `Error::DeviceOffline` if the device is, or becomes, unreachable
    /// - `Error::InvalidParameter` if a code is not in the catalog
    /// - `Error::Protocol` if the device answered with something unusable
    pub async fn execute(&self, name: &str, command: Command) -> Result<DeviceState> {
        let slot = self.registry.require(name)?;

        // Relative commands read the cached state, so translate under the lock.
        let _busy = slot.lock().await;
        if !slot.is_online() {
            return Err(Error::offline(name));
        }

        let patch = {
            let catalog = self.catalog.read();
            translate(&command, &slot.state(), catalog.for_device(name))?
        };

        let address = slot.address();
        tracing::debug!(device = %name, command = %command, "Executing command");

        let echoed = self
            .call(&address, self.api.post_state(&address, &patch))
            .await
            .map_err(|e| self.fail(&slot, e))?;

        if command.needs_settle() {
            tokio::time::sleep(self.settle).await;
        }

        let confirmed = match self.call(&address, self.api.get_state(&address)).await {
            Ok(state) => state,
            Err(e) if e.is_unreachable() => {
                // The write landed; keep what the device echoed, if anything.
                if let Some(state) = echoed {
                    self.record_state(&slot, &state);
                }
                return Err(self.fail(&slot, e));
            }
            Err(e) => return Err(self.fail(&slot, e)),
        };

        self.record_state(&slot, &confirmed);
        tracing::info!(device = %name, command = %command, "Command applied");
        Ok(slot.state())
    }

    /// Polls one device.
    ///
    /// With `wait` false a device held by a command is skipped instead of
    /// waited for.
    pub async fn refresh(&self, slot: &DeviceSlot, kind: RefreshKind, wait: bool) -> RefreshOutcome {
        let _busy = if wait {
            slot.lock().await
        } else {
            match slot.try_lock() {
                Some(guard) => guard,
                None => {
                    tracing::debug!(device = %slot.name(), "Device busy, poll skipped");
                    return RefreshOutcome::Skipped;
                }
            }
        };
        let address = slot.address();

        if kind == RefreshKind::Full {
            match self.call(&address, self.api.get_info(&address)).await {
                Ok(info) => slot.apply_info(&info),
                Err(e) => return self.poll_failed(slot, e),
            }
        }

        match self.call(&address, self.api.get_state(&address)).await {
            Ok(state) => RefreshOutcome::Updated {
                changed: self.record_state(slot, &state),
            },
            Err(e) => self.poll_failed(slot, e),
        }
    }

    /// Polls every registered device, at most `max_in_flight` at a time.
    pub async fn refresh_all(&self, kind: RefreshKind, wait: bool, max_in_flight: usize) -> PollReport {
        let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
        let mut tasks = JoinSet::new();

        for slot in self.registry.slots() {
            let controller = self.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                controller.refresh(&slot, kind, wait).await
            });
        }

        let mut report = PollReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(RefreshOutcome::Updated { changed }) => {
                    report.updated += 1;
                    report.changed += usize::from(changed);
                }
                Ok(RefreshOutcome::Skipped) => report.skipped += 1,
                Ok(RefreshOutcome::Offline) => report.offline += 1,
                Ok(RefreshOutcome::Failed(_)) => report.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "Poll task failed");
                    report.failed += 1;
                }
            }
        }

        if kind == RefreshKind::Full {
            report.folded = self.fold_duplicates();
        }

        tracing::debug!(kind = ?kind, report = ?report, "Poll pass finished");
        report
    }

    /// Drops registry entries that a full refresh showed to be the same
    /// device as another entry. Returns how many were dropped.
    fn fold_duplicates(&self) -> usize {
        let folded = self.registry.fold_shared_macs();
        if !folded.is_empty() {
            let mut catalog = self.catalog.write();
            for record in &folded {
                catalog.forget(&record.name);
            }
        }
        for record in &folded {
            self.events
                .publish(BridgeEvent::device_removed(record.name.as_str()));
        }
        folded.len()
    }

    /// Rebuilds the catalog from every registered device, swaps it in and
    /// publishes the totals.
    ///
    /// Rebuilds run one at a time. Devices removed while the fetches were
    /// in flight are left out. Fetches are bounded by the adapter's own
    /// timeout.
    pub async fn rebuild_catalog(&self, rules: &dyn EffectTagRules, max_in_flight: usize) -> RebuildReport {
        let _rebuilding = self.rebuilding.lock().await;
        let targets = self
            .registry
            .slots()
            .iter()
            .map(|slot| (slot.name().to_string(), slot.address()))
            .collect();
        let previous = self.catalog.read().clone();

        let (mut set, mut report) = rebuild(&self.api, targets, &previous, rules, max_in_flight).await;

        {
            let mut catalog = self.catalog.write();
            if set.retain_devices(|name| self.registry.get(name).is_some()) {
                report.count(&set);
            }
            *catalog = set;
        }
        self.events.publish(BridgeEvent::catalog_rebuilt(&report));
        report
    }

    /// Writes a state document into the cache and publishes what changed.
    /// Returns `true` if the snapshot changed.
    pub(crate) fn record_state(&self, slot: &DeviceSlot, state: &StateRecord) -> bool {
        let update = slot.apply_state(state);
        if update.came_online {
            tracing::info!(device = %slot.name(), "Device online");
            self.events
                .publish(BridgeEvent::online_changed(slot.name(), true));
        }
        if update.changed {
            self.events
                .publish(BridgeEvent::state_changed(slot.name(), slot.state()));
        }
        update.changed
    }

    /// Marks a device offline and publishes the change.
    pub(crate) fn mark_offline(&self, slot: &DeviceSlot) {
        if slot.mark_offline() {
            tracing::warn!(device = %slot.name(), "Device offline");
            self.events
                .publish(BridgeEvent::online_changed(slot.name(), false));
        }
    }

    /// Bounds a device call by the request timeout.
    async fn call<T>(
        &self,
        address: &str,
        request: impl Future<Output = std::result::Result<T, ApiError>>,
    ) -> std::result::Result<T, ApiError> {
        tokio::time::timeout(self.request_timeout, request)
            .await
            .unwrap_or_else(|_| Err(ApiError::unreachable(address, "timed out")))
    }

    /// Maps a failed command call to the error the caller sees.
    fn fail(&self, slot: &DeviceSlot, err: ApiError) -> Error {
        if err.is_unreachable() {
            tracing::warn!(device = %slot.name(), error = %err, "Command failed, device unreachable");
            self.mark_offline(slot);
            Error::offline(slot.name())
        } else {
            tracing::warn!(device = %slot.name(), error = %err, "Command failed");
            err.into()
        }
    }

    fn poll_failed(&self, slot: &DeviceSlot, err: ApiError) -> RefreshOutcome {
        if err.is_unreachable() {
            tracing::debug!(device = %slot.name(), error = %err, "Poll failed");
            self.mark_offline(slot);
            RefreshOutcome::Offline
        } else {
            tracing::warn!(device = %slot.name(), error = %err, "Poll returned an unusable answer");
            RefreshOutcome::Failed(err.into())
        }
    }
}
