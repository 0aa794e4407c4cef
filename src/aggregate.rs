// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fleet-wide commands and summary counts.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::command::Command;
use crate::controller::DeviceController;
use crate::error::Result;
use crate::protocol::DeviceApi;
use crate::registry::DeviceRecord;
use crate::state::DeviceState;
use crate::types::Percent;

/// Per-device results of a fleet-wide command.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Devices that confirmed the command.
    pub applied: usize,
    /// Devices that did not.
    pub failed: usize,
    /// Each device's result, in name order.
    pub results: Vec<(String, Result<DeviceState>)>,
}

impl BatchOutcome {
    /// Returns `true` if every device confirmed the command.
    #[must_use]
    pub fn all_applied(&self) -> bool {
        self.failed == 0
    }

    /// Returns the result for one device.
    #[must_use]
    pub fn result(&self, device: &str) -> Option<&Result<DeviceState>> {
        self.results
            .iter()
            .find(|(name, _)| name == device)
            .map(|(_, r)| r)
    }
}

/// Summary of the device table. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateView {
    /// Registered devices.
    pub total: usize,
    /// Devices that answered their last contact.
    pub online: usize,
    /// Online devices that are powered on.
    pub on: usize,
    /// LEDs across online devices.
    pub total_leds: u32,
    /// Mean brightness of online devices that are on.
    pub average_brightness: Option<Percent>,
}

/// Computes the summary from cached records. Offline devices only count
/// toward `total`.
///
/// # Examples
///
/// ```
/// use wled_bridge::aggregate::summarize;
///
/// let view = summarize(&[]);
/// assert_eq!(view.total, 0);
/// assert_eq!(view.average_brightness, None);
/// ```
#[must_use]
pub fn summarize(records: &[DeviceRecord]) -> AggregateView {
    let mut view = AggregateView {
        total: records.len(),
        ..AggregateView::default()
    };
    let mut brightness_sum: u32 = 0;

    for record in records.iter().filter(|r| r.online) {
        view.online += 1;
        view.total_leds += u32::from(record.state.led_count);
        if record.state.power {
            view.on += 1;
            brightness_sum += u32::from(record.state.brightness.value());
        }
    }

    if let Ok(count) = u32::try_from(view.on) {
        if count > 0 {
            let mean = (brightness_sum + count / 2) / count;
            view.average_brightness = Some(Percent::clamped(u8::try_from(mean).unwrap_or(100)));
        }
    }

    view
}

/// Sends `command` to every registered device, at most `max_in_flight` at a
/// time. A slow or failing device never holds up the others.
pub async fn apply_to_all<A: DeviceApi>(
    controller: &DeviceController<A>,
    command: Command,
    max_in_flight: usize,
) -> BatchOutcome {
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();

    for name in controller.registry().names() {
        let controller = controller.clone();
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = controller.execute(&name, command).await;
            (name, result)
        });
    }

    let mut outcome = BatchOutcome::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, result)) => {
                if result.is_ok() {
                    outcome.applied += 1;
                } else {
                    outcome.failed += 1;
                }
                outcome.results.push((name, result));
            }
            Err(e) => {
                tracing::error!(error = %e, "Batch task failed");
                outcome.failed += 1;
            }
        }
    }
    outcome.results.sort_by(|a, b| a.0.cmp(&b.0));

    tracing::info!(
        command = %command,
        applied = outcome.applied,
        failed = outcome.failed,
        "Batch command finished"
    );
    outcome
}
