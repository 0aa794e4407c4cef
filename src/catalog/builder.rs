// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Catalog rebuild across all devices.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::metadata::{CatalogKind, MetadataCatalog};
use super::tags::EffectTagRules;
use crate::error::{ApiError, Error};
use crate::protocol::DeviceApi;
use crate::response::CapabilityList;

/// The merged catalog plus every device's own catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogSet {
    merged: MetadataCatalog,
    per_device: BTreeMap<String, MetadataCatalog>,
}

impl CatalogSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the catalog merged across devices.
    #[must_use]
    pub fn merged(&self) -> &MetadataCatalog {
        &self.merged
    }

    /// Returns one device's own catalog, if it was ever fetched.
    #[must_use]
    pub fn device(&self, name: &str) -> Option<&MetadataCatalog> {
        self.per_device.get(name)
    }

    /// Returns the catalog commands for `name` are validated against: the
    /// device's own when it has one, the merged catalog otherwise.
    #[must_use]
    pub fn for_device(&self, name: &str) -> &MetadataCatalog {
        self.per_device
            .get(name)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.merged)
    }

    /// Drops a device's catalog. The merged catalog is left as is until the
    /// next rebuild.
    pub fn forget(&mut self, name: &str) {
        self.per_device.remove(name);
    }

    /// Drops every device catalog `keep` rejects and refolds the merged
    /// catalog from the rest. Returns `true` if anything was dropped.
    pub fn retain_devices(&mut self, keep: impl Fn(&str) -> bool) -> bool {
        let before = self.per_device.len();
        self.per_device.retain(|name, _| keep(name));
        if self.per_device.len() == before {
            return false;
        }
        *self = Self::from_devices(std::mem::take(&mut self.per_device));
        true
    }

    /// Builds a set from per-device catalogs, folding them in name order.
    #[must_use]
    pub fn from_devices(per_device: BTreeMap<String, MetadataCatalog>) -> Self {
        let mut merged = MetadataCatalog::new();
        for (name, catalog) in &per_device {
            merged.absorb(catalog, name);
        }
        Self { merged, per_device }
    }
}

/// What a rebuild did.
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Devices whose capabilities were fetched.
    pub refreshed: Vec<String>,
    /// Devices that could not be fetched. Their previous catalog was kept.
    pub failed: Vec<(String, Error)>,
    /// Effects in the merged catalog.
    pub effects: usize,
    /// Palettes in the merged catalog.
    pub palettes: usize,
    /// Presets in the merged catalog.
    pub presets: usize,
    /// Playlists in the merged catalog.
    pub playlists: usize,
    /// Label conflicts recorded in the merged catalog.
    pub conflicts: usize,
}

impl RebuildReport {
    /// Returns `true` if every device was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Takes the totals from a set's merged catalog.
    pub(crate) fn count(&mut self, set: &CatalogSet) {
        let merged = set.merged();
        self.effects = merged.len(CatalogKind::Effect);
        self.palettes = merged.len(CatalogKind::Palette);
        self.presets = merged.len(CatalogKind::Preset);
        self.playlists = merged.len(CatalogKind::Playlist);
        self.conflicts = merged.conflict_count();
    }
}

/// Fetches every device's capabilities and builds a fresh [`CatalogSet`].
///
/// `targets` are `(name, address)` pairs. At most `max_in_flight` fetches
/// run at once. A device that fails keeps its entry from `previous`, so one
/// unreachable device does not empty the catalog. The result depends only on
/// what devices report, not on the order fetches complete in.
pub async fn rebuild<A: DeviceApi>(
    api: &A,
    targets: Vec<(String, String)>,
    previous: &CatalogSet,
    rules: &dyn EffectTagRules,
    max_in_flight: usize,
) -> (CatalogSet, RebuildReport) {
    let fetched = fetch_all(api, targets, max_in_flight).await;

    let mut report = RebuildReport::default();
    let mut per_device = BTreeMap::new();

    for (name, result) in fetched {
        match result {
            Ok(caps) => {
                per_device.insert(name.clone(), MetadataCatalog::from_capabilities(&caps, rules));
                report.refreshed.push(name);
            }
            Err(e) => {
                tracing::warn!(device = %name, error = %e, "Capability fetch failed");
                if let Some(old) = previous.device(&name) {
                    per_device.insert(name.clone(), old.clone());
                }
                report.failed.push((name, e.into()));
            }
        }
    }

    let set = CatalogSet::from_devices(per_device);
    report.count(&set);

    tracing::info!(
        devices = report.refreshed.len(),
        failed = report.failed.len(),
        effects = report.effects,
        palettes = report.palettes,
        presets = report.presets,
        conflicts = report.conflicts,
        "Catalog rebuilt"
    );

    (set, report)
}

async fn fetch_all<A: DeviceApi>(
    api: &A,
    targets: Vec<(String, String)>,
    max_in_flight: usize,
) -> BTreeMap<String, Result<CapabilityList, ApiError>> {
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();

    for (name, address) in targets {
        let api = api.clone();
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = api.get_capabilities(&address).await;
            (name, result)
        });
    }

    let mut results = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, result)) => {
                results.insert(name, result);
            }
            Err(e) => tracing::error!(error = %e, "Capability fetch task failed"),
        }
    }
    results
}
