// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge: one handle over the whole device fleet.
//!
//! [`Bridge`] owns the device table, the metadata catalog, the event bus and
//! the poll scheduler, and exposes the operations a host calls: per-device
//! and fleet-wide commands, discovery, explicit refresh and catalog rebuild,
//! status views and reconfiguration.
//!
//! # Examples
//!
//! ```no_run
//! use wled_bridge::{BridgeConfig, Command, HttpBridge};
//!
//! # async fn example() -> wled_bridge::Result<()> {
//! let config = BridgeConfig::new()
//!     .with_devices("kitchen:192.168.1.20,porch:192.168.1.21")
//!     .with_discover_on_start(false);
//!
//! let bridge = HttpBridge::http(config)?;
//! bridge.start().await;
//!
//! bridge.execute("kitchen", Command::On { brightness: Some(75) }).await?;
//! let status = bridge.status("kitchen")?;
//! println!("{} runs {}", status.name, status.effect);
//!
//! bridge.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use crate::aggregate::{self, AggregateView, BatchOutcome};
use crate::catalog::{CatalogSet, EffectTagRules, FxDataRules, RebuildReport};
use crate::command::Command;
use crate::config::BridgeConfig;
use crate::controller::{DeviceController, PollReport, RefreshKind, RefreshOutcome};
use crate::discovery::{DiscoveryEngine, SweepReport, local_ipv4, subnet_candidates};
use crate::error::{ConfigError, Error, Result};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::DeviceApi;
use crate::registry::{DeviceRecord, DeviceRegistry, MergeOutcome};
use crate::scheduler::{PollScheduler, Schedule};
use crate::state::{DeviceState, DeviceStatus};

#[cfg(feature = "http")]
use crate::protocol::{HttpClient, HttpConfig};

/// A bridge talking HTTP to real devices.
#[cfg(feature = "http")]
pub type HttpBridge = Bridge<HttpClient>;

/// What [`Bridge::apply_config`] changed.
#[derive(Debug, Default)]
pub struct ConfigReport {
    /// Static devices registered.
    pub added: Vec<String>,
    /// Static devices dropped from the configuration and removed.
    pub removed: Vec<String>,
    /// Static devices whose address changed.
    pub moved: Vec<String>,
    /// Entries that were skipped.
    pub warnings: Vec<ConfigError>,
}

/// What [`Bridge::discover`] found.
#[derive(Debug, Default)]
pub struct DiscoverReport {
    /// Sweep totals.
    pub sweep: SweepReport,
    /// How each found controller was merged into the device table.
    pub merged: Vec<MergeOutcome>,
}

impl DiscoverReport {
    /// Returns the names of newly registered devices.
    pub fn added(&self) -> impl Iterator<Item = &str> {
        self.merged.iter().filter_map(|outcome| match outcome {
            MergeOutcome::Added(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// What [`Bridge::start`] did.
#[derive(Debug, Default)]
pub struct StartReport {
    /// Result of applying the configuration.
    pub config: ConfigReport,
    /// Discovery result, when discovery ran.
    pub discovery: Option<DiscoverReport>,
    /// Result of the initial full refresh.
    pub poll: PollReport,
    /// Result of the initial catalog build.
    pub catalog: RebuildReport,
}

/// Handle over the device fleet.
///
/// Owns the device table, the catalog, the event bus and the poll timers.
pub struct Bridge<A: DeviceApi> {
    controller: DeviceController<A>,
    config: RwLock<BridgeConfig>,
    rules: Arc<dyn EffectTagRules>,
    static_devices: Mutex<BTreeSet<String>>,
    scheduler: Mutex<Option<PollScheduler>>,
}

impl<A: DeviceApi> std::fmt::Debug for Bridge<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("devices", &self.controller.registry().len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "http")]
impl Bridge<HttpClient> {
    /// Creates a bridge with an HTTP client using the configured request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns `Error::Unreachable` if the HTTP client cannot be created.
    pub fn http(config: BridgeConfig) -> Result<Self> {
        let client = HttpConfig::new()
            .with_timeout(config.request_timeout())
            .into_client()?;
        Ok(Self::new(client, config))
    }
}

impl<A: DeviceApi> Bridge<A> {
    /// Creates a bridge over `api`. Nothing is contacted and no device is
    /// registered until [`start`](Self::start) or
    /// [`apply_config`](Self::apply_config).
    pub fn new(api: A, config: BridgeConfig) -> Self {
        let controller = DeviceController::new(
            api,
            Arc::new(DeviceRegistry::new()),
            Arc::new(RwLock::new(CatalogSet::new())),
            EventBus::new(),
        )
        .with_request_timeout(config.request_timeout())
        .with_settle(config.preset_settle());

        Self {
            controller,
            config: RwLock::new(config),
            rules: Arc::new(FxDataRules),
            static_devices: Mutex::new(BTreeSet::new()),
            scheduler: Mutex::new(None),
        }
    }

    /// Replaces the rules used to tag effects during catalog builds.
    #[must_use]
    pub fn with_tag_rules(mut self, rules: impl EffectTagRules + 'static) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Returns a copy of the current configuration.
    #[must_use]
    pub fn config(&self) -> BridgeConfig {
        self.config.read().clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Brings the bridge up: registers static devices, optionally sweeps the
    /// network, reads every device, builds the catalog and starts the poll
    /// timers. A running scheduler is restarted.
    pub async fn start(&self) -> StartReport {
        self.stop_scheduler().await;

        let config = self.config();
        let mut report = StartReport {
            config: self.apply_config(config.clone()),
            ..StartReport::default()
        };
        if config.discover_on_start {
            // Configured devices report their MACs first, so the sweep can
            // recognise them behind a hostname or another address.
            self.query().await;
            report.discovery = Some(self.discover().await);
        }
        report.poll = self.query().await;
        report.catalog = self.rebuild_catalog().await;

        let scheduler = PollScheduler::start(
            self.controller.clone(),
            Schedule {
                poll_interval: config.poll_interval(),
                resync_interval: config.resync_interval(),
                max_in_flight: config.max_in_flight(),
            },
            Arc::clone(&self.rules),
        );
        *self.scheduler.lock() = Some(scheduler);

        tracing::info!(
            devices = self.controller.registry().len(),
            online = report.poll.updated,
            "Bridge started"
        );
        report
    }

    /// Stops the poll timers. Commands keep working.
    pub async fn shutdown(&self) {
        self.stop_scheduler().await;
        tracing::info!("Bridge stopped");
    }

    /// Returns `true` while the poll timers run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler
            .lock()
            .as_ref()
            .is_some_and(PollScheduler::is_running)
    }

    async fn stop_scheduler(&self) {
        let scheduler = self.scheduler.lock().take();
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await;
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Reconciles the static device list with `config` and stores it.
    ///
    /// New entries are registered, entries whose address changed are moved,
    /// and static devices missing from `config` are removed. Discovered
    /// devices are never touched. Timer and timeout settings take effect on
    /// the next [`start`](Self::start).
    pub fn apply_config(&self, config: BridgeConfig) -> ConfigReport {
        let (entries, warnings) = config.device_entries();
        let mut report = ConfigReport {
            warnings,
            ..ConfigReport::default()
        };
        let registry = self.controller.registry();
        let wanted: BTreeSet<String> = entries.iter().map(|e| e.name.clone()).collect();

        {
            let mut statics = self.static_devices.lock();
            for name in statics.difference(&wanted) {
                if self.forget_device(name).is_ok() {
                    report.removed.push(name.clone());
                }
            }

            for entry in &entries {
                match registry.get(&entry.name) {
                    Some(slot) if slot.address() != entry.address => {
                        tracing::info!(
                            device = %entry.name,
                            address = %entry.address,
                            "Configured address changed"
                        );
                        slot.set_address(&entry.address);
                        report.moved.push(entry.name.clone());
                    }
                    Some(_) => {}
                    None => match registry.add(&entry.name, &entry.address) {
                        Ok(_) => {
                            self.controller
                                .events()
                                .publish(BridgeEvent::device_added(&entry.name));
                            report.added.push(entry.name.clone());
                        }
                        Err(e) => tracing::warn!(device = %entry.name, error = %e, "Device not added"),
                    },
                }
            }

            *statics = wanted;
        }

        *self.config.write() = config;
        report
    }

    /// Registers a device by hand.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateDevice` if the name is taken.
    pub fn add_device(&self, name: &str, address: &str) -> Result<()> {
        self.controller.registry().add(name, address)?;
        self.controller
            .events()
            .publish(BridgeEvent::device_added(name));
        Ok(())
    }

    /// Removes a device and returns its last record.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this name.
    pub fn remove_device(&self, name: &str) -> Result<DeviceRecord> {
        self.static_devices.lock().remove(name);
        self.forget_device(name)
    }

    fn forget_device(&self, name: &str) -> Result<DeviceRecord> {
        let record = self.controller.registry().remove(name)?;
        self.controller.catalog().write().forget(name);
        self.controller
            .events()
            .publish(BridgeEvent::device_removed(name));
        Ok(record)
    }

    // ========================================================================
    // Controller node actions
    // ========================================================================

    /// Sweeps the local /24 and merges what answers into the device table.
    pub async fn discover(&self) -> DiscoverReport {
        let candidates = match local_ipv4().await {
            Some(local) => subnet_candidates(local),
            None => {
                tracing::warn!("No local IPv4 address, discovery skipped");
                Vec::new()
            }
        };
        self.discover_addresses(candidates).await
    }

    /// Probes the given addresses and merges what answers into the device
    /// table.
    pub async fn discover_addresses(&self, candidates: Vec<String>) -> DiscoverReport {
        let options = self.config.read().discovery;
        let engine = DiscoveryEngine::new(self.controller.api().clone(), options);
        let sweep = engine.sweep(candidates).await;

        let registry = self.controller.registry();
        let merged: Vec<MergeOutcome> = sweep
            .found
            .iter()
            .map(|(address, info)| registry.merge_discovered(address, info))
            .collect();

        for outcome in &merged {
            if let MergeOutcome::Added(name) = outcome {
                self.controller
                    .events()
                    .publish(BridgeEvent::device_added(name));
            }
        }

        tracing::info!(
            found = sweep.found.len(),
            added = merged.iter().filter(|m| matches!(m, MergeOutcome::Added(_))).count(),
            "Discovery finished"
        );
        DiscoverReport { sweep, merged }
    }

    /// Reads info and state from every device, waiting for devices a
    /// command holds.
    pub async fn query(&self) -> PollReport {
        let max_in_flight = self.config.read().max_in_flight();
        self.controller
            .refresh_all(RefreshKind::Full, true, max_in_flight)
            .await
    }

    /// Reads info and state from one device, even if it was offline.
    ///
    /// # Errors
    ///
    /// - `Error::DeviceNotFound` if `name` is not registered
    /// - `Error::DeviceOffline` if the device does not answer
    /// - `Error::Protocol` if the device answered with something unusable
    pub async fn query_device(&self, name: &str) -> Result<DeviceState> {
        let slot = self.controller.registry().require(name)?;
        match self.controller.refresh(&slot, RefreshKind::Full, true).await {
            RefreshOutcome::Updated { .. } => Ok(slot.state()),
            RefreshOutcome::Offline | RefreshOutcome::Skipped => Err(Error::offline(name)),
            RefreshOutcome::Failed(e) => Err(e),
        }
    }

    /// Rebuilds the metadata catalog from every device.
    pub async fn rebuild_catalog(&self) -> RebuildReport {
        let max_in_flight = self.config.read().max_in_flight();
        self.controller
            .rebuild_catalog(self.rules.as_ref(), max_in_flight)
            .await
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Runs one command against one device and returns the confirmed state.
    ///
    /// # Errors
    ///
    /// See [`DeviceController::execute`].
    pub async fn execute(&self, name: &str, command: Command) -> Result<DeviceState> {
        self.controller.execute(name, command).await
    }

    /// Runs one command against every device.
    pub async fn apply_to_all(&self, command: Command) -> BatchOutcome {
        let max_in_flight = self.config.read().max_in_flight();
        aggregate::apply_to_all(&self.controller, command, max_in_flight).await
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Returns fleet-wide counts from the cache.
    #[must_use]
    pub fn summarize(&self) -> AggregateView {
        aggregate::summarize(&self.controller.registry().records())
    }

    /// Returns one device with labels resolved.
    ///
    /// # Errors
    ///
    /// Returns `Error::DeviceNotFound` if no device has this name.
    pub fn status(&self, name: &str) -> Result<DeviceStatus> {
        let record = self.controller.registry().require(name)?.snapshot();
        let catalog = self.controller.catalog().read();
        Ok(DeviceStatus::resolve(&record, catalog.for_device(name)))
    }

    /// Returns every device with labels resolved, in name order.
    #[must_use]
    pub fn statuses(&self) -> Vec<DeviceStatus> {
        let records = self.controller.registry().records();
        let catalog = self.controller.catalog().read();
        records
            .iter()
            .map(|record| DeviceStatus::resolve(record, catalog.for_device(&record.name)))
            .collect()
    }

    /// Returns a copy of every device record, in name order.
    #[must_use]
    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.controller.registry().records()
    }

    /// Returns a copy of the current catalogs.
    #[must_use]
    pub fn catalog(&self) -> CatalogSet {
        self.controller.catalog().read().clone()
    }

    /// Subscribes to bridge events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.controller.events().subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogKind;
    use crate::error::ErrorKind;
    use crate::protocol::fake::{Behaviour, FakeApi, FakeDevice};

    fn fleet() -> FakeApi {
        FakeApi::new()
            .with_device(
                "10.0.0.2",
                FakeDevice::online("Kitchen")
                    .with_mac("aa:bb:cc:00:00:02")
                    .with_preset(3, "Evening", false),
            )
            .with_device("10.0.0.3", FakeDevice::online("Porch").with_mac("aa:bb:cc:00:00:03"))
    }

    fn config(devices: &str) -> BridgeConfig {
        BridgeConfig::new()
            .with_devices(devices)
            .with_discover_on_start(false)
    }

    fn drain(events: &mut broadcast::Receiver<BridgeEvent>) -> Vec<BridgeEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[tokio::test]
    async fn start_registers_reads_and_builds_catalog() {
        let bridge = Bridge::new(fleet(), config("kitchen:10.0.0.2,porch:10.0.0.3,bad:"));
        let mut events = bridge.subscribe();

        let report = bridge.start().await;

        assert_eq!(report.config.added, vec!["kitchen".to_string(), "porch".to_string()]);
        assert_eq!(report.config.warnings.len(), 1);
        assert_eq!(report.poll.updated, 2);
        assert!(report.catalog.is_complete());
        assert!(bridge.is_running());
        assert!(bridge.catalog().merged().contains(CatalogKind::Preset, 3));

        let events = drain(&mut events);
        assert!(events.contains(&BridgeEvent::device_added("kitchen")));
        assert!(events.contains(&BridgeEvent::online_changed("porch", true)));

        bridge.shutdown().await;
        assert!(!bridge.is_running());
    }

    #[tokio::test]
    async fn summary_after_start() {
        let api = fleet();
        api.mutate_state("10.0.0.2", |s| {
            s.on = true;
            s.bri = 255;
        });
        let bridge = Bridge::new(api, config("kitchen:10.0.0.2,porch:10.0.0.3,attic:10.0.0.9"));
        bridge.start().await;

        let view = bridge.summarize();

        assert_eq!(view.total, 3);
        assert_eq!(view.online, 2);
        assert_eq!(view.on, 1);
        assert_eq!(view.total_leds, 60);
        assert_eq!(view.average_brightness.map(|p| p.value()), Some(100));
        bridge.shutdown().await;
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    #[tokio::test]
    async fn reconfiguration_removes_dropped_static_devices() {
        let bridge = Bridge::new(fleet(), config("kitchen:10.0.0.2,porch:10.0.0.3"));
        bridge.apply_config(config("kitchen:10.0.0.2,porch:10.0.0.3"));
        bridge.add_device("manual", "10.0.0.7").unwrap();
        let mut events = bridge.subscribe();

        let report = bridge.apply_config(config("kitchen:10.0.0.4"));

        assert_eq!(report.removed, vec!["porch".to_string()]);
        assert_eq!(report.moved, vec!["kitchen".to_string()]);
        assert!(report.added.is_empty());
        let names: Vec<_> = bridge.devices().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["kitchen".to_string(), "manual".to_string()]);
        assert_eq!(bridge.devices()[0].address, "10.0.0.4");
        assert_eq!(drain(&mut events), vec![BridgeEvent::device_removed("porch")]);
    }

    #[test]
    fn duplicate_manual_device_is_rejected() {
        let bridge = Bridge::new(fleet(), BridgeConfig::new());
        bridge.add_device("kitchen", "10.0.0.2").unwrap();

        let err = bridge.add_device("kitchen", "10.0.0.5").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateDevice);
    }

    #[test]
    fn removing_unknown_device_fails() {
        let bridge = Bridge::new(fleet(), BridgeConfig::new());
        assert_eq!(
            bridge.remove_device("ghost").unwrap_err().kind(),
            ErrorKind::DeviceNotFound
        );
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    #[tokio::test]
    async fn discovery_adds_new_devices_once() {
        let bridge = Bridge::new(fleet(), config("kitchen:10.0.0.2"));
        bridge.apply_config(config("kitchen:10.0.0.2"));
        let mut events = bridge.subscribe();
        let candidates = vec!["10.0.0.2".to_string(), "10.0.0.3".to_string(), "10.0.0.4".to_string()];

        let first = bridge.discover_addresses(candidates.clone()).await;
        let second = bridge.discover_addresses(candidates).await;

        assert_eq!(first.added().collect::<Vec<_>>(), vec!["Porch"]);
        assert_eq!(first.sweep.failures, 1);
        assert_eq!(second.added().count(), 0);
        assert_eq!(bridge.devices().len(), 2);
        assert_eq!(drain(&mut events), vec![BridgeEvent::device_added("Porch")]);
    }

    #[tokio::test]
    async fn discovery_follows_a_moved_device() {
        let api = fleet();
        let bridge = Bridge::new(api.clone(), config("kitchen:10.0.0.2"));
        bridge.start().await;
        bridge.shutdown().await;

        api.insert(
            "10.0.0.12",
            FakeDevice::online("Kitchen").with_mac("aa:bb:cc:00:00:02"),
        );
        api.set_behaviour("10.0.0.2", Behaviour::Unreachable);
        let report = bridge.discover_addresses(vec!["10.0.0.12".to_string()]).await;

        assert_eq!(
            report.merged,
            vec![MergeOutcome::Moved {
                name: "kitchen".to_string(),
                from: "10.0.0.2".to_string(),
            }]
        );
        assert_eq!(bridge.status("kitchen").unwrap().address, "10.0.0.12");
    }

    fn kitchen_by_hostname() -> (FakeApi, Bridge<FakeApi>) {
        let api = fleet();
        api.insert(
            "wled-kitchen.local",
            FakeDevice::online("Kitchen").with_mac("aa:bb:cc:00:00:02"),
        );
        let bridge = Bridge::new(api.clone(), config("kitchen:wled-kitchen.local"));
        bridge.apply_config(config("kitchen:wled-kitchen.local"));
        (api, bridge)
    }

    #[tokio::test]
    async fn swept_copy_of_a_configured_device_is_folded() {
        let (_api, bridge) = kitchen_by_hostname();

        // The sweep finds the device before its MAC is known.
        let report = bridge.discover_addresses(vec!["10.0.0.2".to_string()]).await;
        assert_eq!(report.added().collect::<Vec<_>>(), vec!["Kitchen"]);

        let poll = bridge.query().await;

        assert_eq!(poll.folded, 1);
        let devices = bridge.devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "kitchen");
        assert_eq!(bridge.apply_to_all(Command::Off).await.results.len(), 1);
    }

    #[tokio::test]
    async fn sweep_after_query_recognises_configured_device() {
        let (_api, bridge) = kitchen_by_hostname();
        bridge.query().await;

        let report = bridge.discover_addresses(vec!["10.0.0.2".to_string()]).await;

        assert_eq!(report.added().count(), 0);
        assert!(matches!(report.merged[0], MergeOutcome::Moved { .. }));
        assert_eq!(bridge.devices().len(), 1);
    }

    // ========================================================================
    // Commands and views
    // ========================================================================

    #[tokio::test]
    async fn status_resolves_labels_after_commands() {
        let bridge = Bridge::new(fleet(), config("kitchen:10.0.0.2"));
        bridge.start().await;

        bridge.execute("kitchen", Command::SetEffect(2)).await.unwrap();
        bridge.execute("kitchen", Command::LoadPreset(3)).await.unwrap();
        let status = bridge.status("kitchen").unwrap();

        assert_eq!(status.effect, "Breathe");
        assert_eq!(status.preset.as_deref(), Some("Evening"));
        assert_eq!(bridge.statuses().len(), 1);
        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn query_device_brings_a_device_back() {
        let api = fleet();
        let bridge = Bridge::new(api.clone(), config("kitchen:10.0.0.2"));
        api.set_behaviour("10.0.0.2", Behaviour::Unreachable);
        bridge.start().await;
        bridge.shutdown().await;

        let err = bridge.execute("kitchen", Command::Off).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceOffline);

        api.set_behaviour("10.0.0.2", Behaviour::Online);
        let state = bridge.query_device("kitchen").await.unwrap();

        assert_eq!(state.led_count, 30);
        assert!(bridge.execute("kitchen", Command::Off).await.is_ok());
    }

    #[tokio::test]
    async fn fleet_command_reports_each_device() {
        let bridge = Bridge::new(fleet(), config("kitchen:10.0.0.2,porch:10.0.0.3,attic:10.0.0.9"));
        bridge.start().await;

        let outcome = bridge.apply_to_all(Command::On { brightness: Some(50) }).await;

        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(
            outcome.result("attic").unwrap().as_ref().unwrap_err().kind(),
            ErrorKind::DeviceOffline
        );
        assert_eq!(bridge.summarize().on, 2);
        bridge.shutdown().await;
    }
}
