// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Network sweep for WLED controllers.
//!
//! The sweep probes every host of the local /24 with `GET /json/info` and
//! keeps the ones that answer like a controller (the document carries both
//! `ver` and `name`). Probes run concurrently up to a limit, each probe has
//! its own timeout, and the whole sweep has a time budget. Probes still
//! pending when the budget runs out are abandoned and counted as failures.
//!
//! Found devices are merged into the registry by
//! [`DeviceRegistry::merge_discovered`](crate::registry::DeviceRegistry::merge_discovered).
//!
//! # Examples
//!
//! ```no_run
//! use wled_bridge::discovery::{DiscoveryEngine, DiscoveryOptions};
//! use wled_bridge::protocol::HttpClient;
//!
//! # async fn example() -> wled_bridge::Result<()> {
//! let engine = DiscoveryEngine::new(HttpClient::new()?, DiscoveryOptions::new());
//! let report = engine.sweep_local().await;
//!
//! for (address, info) in &report.found {
//!     println!("{address}: {}", info.name.as_deref().unwrap_or("?"));
//! }
//! # Ok(())
//! # }
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::protocol::DeviceApi;
use crate::response::InfoRecord;

const DEFAULT_MAX_IN_FLIGHT: usize = 24;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_000;
const DEFAULT_SWEEP_BUDGET_MS: u64 = 10_000;

/// Public address used to pick the outbound interface. Nothing is sent.
const ROUTE_PROBE: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

/// Limits for a network sweep.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wled_bridge::discovery::DiscoveryOptions;
///
/// let options = DiscoveryOptions::new()
///     .with_max_in_flight(8)
///     .with_probe_timeout(Duration::from_millis(500));
///
/// assert_eq!(options.max_in_flight(), 8);
/// assert_eq!(options.sweep_budget(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryOptions {
    max_in_flight: usize,
    probe_timeout_ms: u64,
    sweep_budget_ms: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            sweep_budget_ms: DEFAULT_SWEEP_BUDGET_MS,
        }
    }
}

impl DiscoveryOptions {
    /// Creates options with the defaults: 24 probes in flight, 1 s per
    /// probe, 10 s for the whole sweep.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many probes may run at once.
    #[must_use]
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Sets the timeout for a single probe.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the time budget for the whole sweep.
    #[must_use]
    pub fn with_sweep_budget(mut self, budget: Duration) -> Self {
        self.sweep_budget_ms = duration_ms(budget);
        self
    }

    /// Returns how many probes may run at once (at least one).
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.max(1)
    }

    /// Returns the timeout for a single probe.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Returns the time budget for the whole sweep.
    #[must_use]
    pub fn sweep_budget(&self) -> Duration {
        Duration::from_millis(self.sweep_budget_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// What a sweep found.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Controllers that answered, by address, in address order.
    pub found: Vec<(String, InfoRecord)>,
    /// Candidates that failed, answered like something else, or were
    /// abandoned at the budget.
    pub failures: usize,
    /// Candidates considered.
    pub probed: usize,
}

/// Probes candidate addresses for controllers.
#[derive(Debug, Clone)]
pub struct DiscoveryEngine<A> {
    api: A,
    options: DiscoveryOptions,
}

impl<A: DeviceApi> DiscoveryEngine<A> {
    /// Creates an engine.
    pub fn new(api: A, options: DiscoveryOptions) -> Self {
        Self { api, options }
    }

    /// Returns the sweep limits.
    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Sweeps the /24 of the local IPv4 address.
    ///
    /// Returns an empty report when no local address can be determined.
    pub async fn sweep_local(&self) -> SweepReport {
        match local_ipv4().await {
            Some(local) => {
                tracing::info!(local = %local, "Sweeping local subnet");
                self.sweep(subnet_candidates(local)).await
            }
            None => {
                tracing::warn!("No local IPv4 address, sweep skipped");
                SweepReport::default()
            }
        }
    }

    /// Probes each candidate once.
    ///
    /// Never fails as a whole: unreachable candidates only count as
    /// failures.
    pub async fn sweep(&self, candidates: Vec<String>) -> SweepReport {
        let mut report = SweepReport {
            probed: candidates.len(),
            ..SweepReport::default()
        };
        let deadline = Instant::now() + self.options.sweep_budget();
        let permits = Arc::new(Semaphore::new(self.options.max_in_flight()));
        let probe_timeout = self.options.probe_timeout();
        let mut tasks = JoinSet::new();

        for address in candidates {
            let api = self.api.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let result = probe(&api, &address, probe_timeout).await;
                (address, result)
            });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((address, Ok(info))))) => report.found.push((address, info)),
                Ok(Some(Ok((address, Err(e))))) => {
                    tracing::trace!(address = %address, error = %e, "Probe failed");
                    report.failures += 1;
                }
                Ok(Some(Err(e))) => {
                    tracing::error!(error = %e, "Probe task failed");
                    report.failures += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    let abandoned = tasks.len();
                    tasks.abort_all();
                    tracing::warn!(abandoned, "Sweep budget exhausted");
                    report.failures += abandoned;
                    break;
                }
            }
        }

        report.found.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::info!(
            probed = report.probed,
            found = report.found.len(),
            failures = report.failures,
            "Sweep finished"
        );
        report
    }
}

/// Asks one address for its info document and checks it is a controller.
///
/// # Errors
///
/// Returns `ApiError::Unreachable` on timeout or connection failure, and
/// `ProtocolError::MissingField` when the answer lacks `ver` or `name`.
pub async fn probe<A: DeviceApi>(api: &A, address: &str, timeout: Duration) -> Result<InfoRecord, ApiError> {
    let info = tokio::time::timeout(timeout, api.get_info(address))
        .await
        .unwrap_or_else(|_| Err(ApiError::unreachable(address, "timed out")))?;
    if info.is_controller() {
        tracing::debug!(address = %address, name = ?info.name, "Controller found");
        Ok(info)
    } else {
        let missing = if info.ver.as_deref().is_none_or(str::is_empty) {
            "ver"
        } else {
            "name"
        };
        Err(crate::error::ProtocolError::MissingField(missing).into())
    }
}

/// Lists the other hosts of `local`'s /24: `.1` to `.254` without `local`.
///
/// # Examples
///
/// ```
/// use std::net::Ipv4Addr;
/// use wled_bridge::discovery::subnet_candidates;
///
/// let hosts = subnet_candidates(Ipv4Addr::new(192, 168, 1, 20));
/// assert_eq!(hosts.len(), 253);
/// assert_eq!(hosts[0], "192.168.1.1");
/// assert!(!hosts.contains(&"192.168.1.20".to_string()));
/// ```
#[must_use]
pub fn subnet_candidates(local: Ipv4Addr) -> Vec<String> {
    let [a, b, c, own] = local.octets();
    (1..=254u8)
        .filter(|host| *host != own)
        .map(|host| Ipv4Addr::new(a, b, c, host).to_string())
        .collect()
}

/// Finds the IPv4 address of the interface that routes outward.
///
/// Connecting a UDP socket sends no packet; it only selects a route.
pub async fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    if let Err(e) = socket.connect(ROUTE_PROBE).await {
        tracing::debug!(error = %e, "No outbound route");
        return None;
    }
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
        _ => None,
    }
}
