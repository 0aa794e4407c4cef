// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration.
//!
//! [`BridgeConfig`] can be deserialized from JSON (every field is optional)
//! or built programmatically. Static devices are given as one string of
//! comma-separated `name:address[:port]` entries, the format host
//! frameworks store custom parameters in. A bare address is also accepted
//! and named after itself.
//!
//! Malformed entries never fail the whole configuration. They are skipped,
//! logged, and returned next to the valid entries.
//!
//! # Examples
//!
//! ```
//! use wled_bridge::config::BridgeConfig;
//!
//! let config = BridgeConfig::from_json(r#"{
//!     "devices": "kitchen:192.168.1.20, porch:192.168.1.21:8080, nonsense:",
//!     "poll_interval_secs": 10
//! }"#).unwrap();
//!
//! let (entries, warnings) = config.device_entries();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[1].address, "192.168.1.21:8080");
//! assert_eq!(warnings.len(), 1);
//! ```

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::DiscoveryOptions;
use crate::error::ConfigError;
use crate::registry::name_from_address;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_MAX_IN_FLIGHT: usize = 16;
const DEFAULT_PRESET_SETTLE_MS: u64 = 300;

/// Request timeouts stay under the 5 s a sweep probe may take.
const MAX_REQUEST_TIMEOUT_MS: u64 = 4_900;
const MIN_REQUEST_TIMEOUT_MS: u64 = 100;

/// Settings for a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Static devices, `name:address[:port]` separated by commas.
    pub devices: String,
    /// Seconds between light refreshes.
    pub poll_interval_secs: u64,
    /// Seconds between full resyncs (info, state and catalog).
    pub resync_interval_secs: u64,
    /// Upper bound for one device request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Sweep the local subnet when the bridge starts.
    pub discover_on_start: bool,
    /// Concurrent device requests for polls, batches and rebuilds.
    pub max_in_flight: usize,
    /// Wait after loading a preset before reading the state back.
    pub preset_settle_ms: u64,
    /// Sweep limits.
    pub discovery: DiscoveryOptions,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            devices: String::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            discover_on_start: true,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            preset_settle_ms: DEFAULT_PRESET_SETTLE_MS,
            discovery: DiscoveryOptions::default(),
        }
    }
}

impl BridgeConfig {
    /// Creates a configuration with defaults and no static devices.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Document` if the document is not valid JSON or
    /// a field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Document(e.to_string()))
    }

    /// Sets the static device list.
    #[must_use]
    pub fn with_devices(mut self, devices: impl Into<String>) -> Self {
        self.devices = devices.into();
        self
    }

    /// Sets the light refresh interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_secs = interval.as_secs();
        self
    }

    /// Sets the full resync interval.
    #[must_use]
    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval_secs = interval.as_secs();
        self
    }

    /// Enables or disables the sweep at startup.
    #[must_use]
    pub fn with_discover_on_start(mut self, enabled: bool) -> Self {
        self.discover_on_start = enabled;
        self
    }

    /// Returns the light refresh interval, at least one second.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Returns the full resync interval, at least one second.
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs.max(1))
    }

    /// Returns the request timeout, kept between 100 ms and 4.9 s.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .clamp(MIN_REQUEST_TIMEOUT_MS, MAX_REQUEST_TIMEOUT_MS),
        )
    }

    /// Returns the concurrency limit, at least one.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.max(1)
    }

    /// Returns the preset settle delay.
    #[must_use]
    pub fn preset_settle(&self) -> Duration {
        Duration::from_millis(self.preset_settle_ms)
    }

    /// Parses the static device list. See [`parse_device_list`].
    #[must_use]
    pub fn device_entries(&self) -> (Vec<DeviceEntry>, Vec<ConfigError>) {
        parse_device_list(&self.devices)
    }
}

/// One static device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Device name.
    pub name: String,
    /// `host` or `host:port`.
    pub address: String,
}

impl DeviceEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Parses `name:address[:port]` entries separated by commas.
///
/// Whitespace around entries and parts is ignored, as are empty entries. A
/// bare address is named after itself (`10.0.0.5` becomes `10_0_0_5`).
/// Malformed entries and repeated names are skipped and returned as
/// warnings; the first entry with a given name wins.
///
/// # Examples
///
/// ```
/// use wled_bridge::config::parse_device_list;
///
/// let (entries, warnings) = parse_device_list("desk:10.0.0.4, 10.0.0.5, :10.0.0.6");
///
/// assert_eq!(entries[0].name, "desk");
/// assert_eq!(entries[1].name, "10_0_0_5");
/// assert_eq!(warnings.len(), 1);
/// ```
#[must_use]
pub fn parse_device_list(input: &str) -> (Vec<DeviceEntry>, Vec<ConfigError>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for raw in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = parse_entry(raw).and_then(|entry| {
            if seen.insert(entry.name.clone()) {
                Ok(entry)
            } else {
                Err(malformed(raw, "duplicate device name"))
            }
        });
        match parsed {
            Ok(entry) => entries.push(entry),
            Err(warning) => {
                tracing::warn!(error = %warning, "Skipping device entry");
                warnings.push(warning);
            }
        }
    }

    (entries, warnings)
}

fn parse_entry(raw: &str) -> Result<DeviceEntry, ConfigError> {
    let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
    match parts.as_slice() {
        [address] => Ok(DeviceEntry::new(name_from_address(address), *address)),
        [name, host] => named(raw, name, host).map(|name| DeviceEntry::new(name, *host)),
        [name, host, port] => {
            let port: u16 = port
                .parse()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| malformed(raw, "port must be 1-65535"))?;
            named(raw, name, host).map(|name| DeviceEntry::new(name, format!("{host}:{port}")))
        }
        _ => Err(malformed(raw, "expected name:address[:port]")),
    }
}

fn named(raw: &str, name: &str, host: &str) -> Result<String, ConfigError> {
    if name.is_empty() {
        return Err(malformed(raw, "missing name"));
    }
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(malformed(raw, "missing or invalid address"));
    }
    Ok(name.to_string())
}

fn malformed(entry: &str, reason: &str) -> ConfigError {
    ConfigError::MalformedEntry {
        entry: entry.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Device list
    // ========================================================================

    #[test]
    fn parses_names_addresses_and_ports() {
        let (entries, warnings) = parse_device_list("kitchen:192.168.1.20,porch : 192.168.1.21 : 8080");

        assert!(warnings.is_empty());
        assert_eq!(
            entries,
            vec![
                DeviceEntry::new("kitchen", "192.168.1.20"),
                DeviceEntry::new("porch", "192.168.1.21:8080"),
            ]
        );
    }

    #[test]
    fn bare_address_is_named_after_itself() {
        let (entries, _) = parse_device_list("192.168.1.30");
        assert_eq!(entries, vec![DeviceEntry::new("192_168_1_30", "192.168.1.30")]);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let (entries, warnings) =
            parse_device_list("good:10.0.0.2, :10.0.0.3, bad:, x:10.0.0.4:port, a:b:c:d, ,good:10.0.0.9");

        assert_eq!(entries, vec![DeviceEntry::new("good", "10.0.0.2")]);
        assert_eq!(warnings.len(), 5);
        assert!(matches!(
            &warnings[0],
            ConfigError::MalformedEntry { entry, reason } if entry == ":10.0.0.3" && reason == "missing name"
        ));
        assert!(
            warnings[4]
                .to_string()
                .contains("duplicate device name")
        );
    }

    #[test]
    fn empty_list_has_no_entries() {
        let (entries, warnings) = parse_device_list("  ");
        assert!(entries.is_empty());
        assert!(warnings.is_empty());
    }

    // ========================================================================
    // Document
    // ========================================================================

    #[test]
    fn defaults_apply_to_missing_fields() {
        let config = BridgeConfig::from_json("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_in_flight(), 16);
        assert!(config.discover_on_start);
    }

    #[test]
    fn zero_intervals_are_raised() {
        let config = BridgeConfig::new()
            .with_poll_interval(Duration::ZERO)
            .with_resync_interval(Duration::ZERO);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.resync_interval(), Duration::from_secs(1));
    }

    #[test]
    fn request_timeout_stays_below_five_seconds() {
        let config = BridgeConfig {
            request_timeout_ms: 60_000,
            ..BridgeConfig::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_millis(4_900));
    }

    #[test]
    fn nested_discovery_options() {
        let config = BridgeConfig::from_json(r#"{"discovery":{"probe_timeout_ms":250}}"#).unwrap();
        assert_eq!(config.discovery.probe_timeout(), Duration::from_millis(250));
        assert_eq!(config.discovery.max_in_flight(), 24);
    }

    #[test]
    fn wrong_type_is_a_document_error() {
        let err = BridgeConfig::from_json(r#"{"poll_interval_secs":"soon"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Document(_)));
    }
}
