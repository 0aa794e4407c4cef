// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Periodic polling.
//!
//! Two independent timers drive the device table:
//!
//! - the **light refresh** reads live state from every device, skipping
//!   devices a command is holding;
//! - the **full resync** also reads device info and then rebuilds the
//!   metadata catalog.
//!
//! Each timer runs its cycle as a separate task. When a tick arrives while
//! the previous cycle of the same timer is still running, the tick is
//! skipped, so cycles never pile up behind a slow network.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::catalog::EffectTagRules;
use crate::controller::{DeviceController, RefreshKind};
use crate::protocol::DeviceApi;

/// Timer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Period of the light refresh.
    pub poll_interval: Duration,
    /// Period of the full resync.
    pub resync_interval: Duration,
    /// Concurrent device requests per cycle.
    pub max_in_flight: usize,
}

/// Cycle counters.
#[derive(Debug, Default)]
struct Counters {
    light: AtomicUsize,
    full: AtomicUsize,
    skipped: AtomicUsize,
}

/// How many cycles have started so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Light refresh cycles started.
    pub light_cycles: usize,
    /// Full resync cycles started.
    pub full_cycles: usize,
    /// Ticks dropped because the previous cycle was still running.
    pub skipped_ticks: usize,
}

/// Handle to the running timers. Dropping it stops them.
#[derive(Debug)]
pub struct PollScheduler {
    token: CancellationToken,
    timers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl PollScheduler {
    /// Starts both timers. The first cycle of each runs one period from now.
    pub fn start<A: DeviceApi>(
        controller: DeviceController<A>,
        schedule: Schedule,
        rules: Arc<dyn EffectTagRules>,
    ) -> Self {
        let token = CancellationToken::new();
        let counters = Arc::new(Counters::default());
        let max_in_flight = schedule.max_in_flight.max(1);

        let light = {
            let controller = controller.clone();
            let counters = Arc::clone(&counters);
            run_timer(
                "light",
                schedule.poll_interval,
                token.child_token(),
                Arc::clone(&counters),
                move || {
                    counters.light.fetch_add(1, Ordering::Relaxed);
                    let controller = controller.clone();
                    async move {
                        controller
                            .refresh_all(RefreshKind::Light, false, max_in_flight)
                            .await;
                    }
                },
            )
        };

        let full = {
            let counters = Arc::clone(&counters);
            run_timer(
                "full",
                schedule.resync_interval,
                token.child_token(),
                Arc::clone(&counters),
                move || {
                    counters.full.fetch_add(1, Ordering::Relaxed);
                    let controller = controller.clone();
                    let rules = Arc::clone(&rules);
                    async move {
                        controller
                            .refresh_all(RefreshKind::Full, false, max_in_flight)
                            .await;
                        controller
                            .rebuild_catalog(rules.as_ref(), max_in_flight)
                            .await;
                    }
                },
            )
        };

        tracing::info!(
            poll_secs = schedule.poll_interval.as_secs_f32(),
            resync_secs = schedule.resync_interval.as_secs_f32(),
            "Poll scheduler started"
        );

        Self {
            token,
            timers: vec![light, full],
            counters,
        }
    }

    /// Returns the cycle counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            light_cycles: self.counters.light.load(Ordering::Relaxed),
            full_cycles: self.counters.full.load(Ordering::Relaxed),
            skipped_ticks: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Stops both timers, aborts cycles in flight and waits for the timer
    /// tasks to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        for timer in self.timers.drain(..) {
            if let Err(e) = timer.await {
                if !e.is_cancelled() {
                    tracing::error!(error = %e, "Scheduler timer failed");
                }
            }
        }
        tracing::info!("Poll scheduler stopped");
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn run_timer<F, Fut>(
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    counters: Arc<Counters>,
    mut cycle: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut running: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    if let Some(task) = running.take() {
                        task.abort();
                    }
                    break;
                }
                _ = ticker.tick() => {
                    if running.as_ref().is_some_and(|task| !task.is_finished()) {
                        counters.skipped.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(timer = name, "Previous cycle still running, tick skipped");
                        continue;
                    }
                    tracing::trace!(timer = name, "Cycle started");
                    running = Some(tokio::spawn(cycle()));
                }
            }
        }
    })
}
