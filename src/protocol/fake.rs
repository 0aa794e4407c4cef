// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scripted in-memory [`DeviceApi`] for unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::command::StatePatch;
use crate::error::{ApiError, ProtocolError};
use crate::protocol::DeviceApi;
use crate::response::{
    CapabilityList, InfoRecord, LedsRecord, PresetRecord, SegmentRecord, StateRecord,
};

/// How a scripted device answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behaviour {
    /// Answers normally.
    Online,
    /// Connection refused.
    Unreachable,
    /// Never answers.
    Hang,
    /// Answers with a non-2xx status.
    ServerError,
    /// Acknowledges writes without echoing the state.
    AckOnly,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    GetState(String),
    PostState(String, StatePatch),
    GetInfo(String),
    GetCapabilities(String),
}

impl Call {
    pub(crate) fn address(&self) -> &str {
        match self {
            Self::GetState(a) | Self::PostState(a, _) | Self::GetInfo(a) | Self::GetCapabilities(a) => a,
        }
    }
}

/// A scripted device.
#[derive(Debug, Clone)]
pub(crate) struct FakeDevice {
    pub(crate) behaviour: Behaviour,
    pub(crate) delay: Option<Duration>,
    /// Runs after every write, like firmware limits the device applies.
    pub(crate) after_post: Option<fn(&mut StateRecord)>,
    pub(crate) state: StateRecord,
    pub(crate) info: InfoRecord,
    pub(crate) caps: CapabilityList,
}

impl FakeDevice {
    /// A reachable device with one segment, 30 LEDs and a small catalog.
    pub(crate) fn online(name: &str) -> Self {
        let info = InfoRecord {
            ver: Some("0.14.4".to_string()),
            name: Some(name.to_string()),
            leds: LedsRecord {
                count: 30,
                maxseg: 16,
            },
            ..InfoRecord::default()
        };
        let state = StateRecord {
            on: false,
            bri: 128,
            seg: vec![SegmentRecord {
                id: 0,
                len: 30,
                stop: 30,
                col: vec![serde_json::json!([255, 160, 0])],
                ..SegmentRecord::default()
            }],
            ..StateRecord::default()
        };
        let caps = CapabilityList {
            info: info.clone(),
            effects: ["Solid", "Blink", "Breathe", "Wipe"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            palettes: ["Default", "Random Cycle", "Party"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            ..CapabilityList::default()
        };
        Self {
            behaviour: Behaviour::Online,
            delay: None,
            after_post: None,
            state,
            info,
            caps,
        }
    }

    pub(crate) fn with_behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn with_after_post(mut self, f: fn(&mut StateRecord)) -> Self {
        self.after_post = Some(f);
        self
    }

    pub(crate) fn with_state(mut self, f: impl FnOnce(&mut StateRecord)) -> Self {
        f(&mut self.state);
        self
    }

    pub(crate) fn with_mac(mut self, mac: &str) -> Self {
        self.info.mac = mac.to_string();
        self.caps.info.mac = mac.to_string();
        self
    }

    pub(crate) fn with_leds(mut self, count: u16) -> Self {
        self.info.leds.count = count;
        self.caps.info.leds.count = count;
        self
    }

    pub(crate) fn with_effects(mut self, effects: &[&str]) -> Self {
        self.caps.effects = effects.iter().map(ToString::to_string).collect();
        self
    }

    pub(crate) fn with_preset(mut self, id: u16, name: &str, playlist: bool) -> Self {
        self.caps.presets.insert(
            id,
            PresetRecord {
                n: Some(name.to_string()),
                playlist: playlist.then(|| serde_json::json!({"ps": [1], "dur": [300]})),
            },
        );
        self
    }
}

#[derive(Debug, Default)]
struct Inner {
    devices: HashMap<String, FakeDevice>,
    calls: Vec<Call>,
}

/// A [`DeviceApi`] backed by scripted devices keyed by address.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_device(self, address: &str, device: FakeDevice) -> Self {
        self.insert(address, device);
        self
    }

    pub(crate) fn insert(&self, address: &str, device: FakeDevice) {
        self.inner.lock().devices.insert(address.to_string(), device);
    }

    pub(crate) fn set_behaviour(&self, address: &str, behaviour: Behaviour) {
        if let Some(device) = self.inner.lock().devices.get_mut(address) {
            device.behaviour = behaviour;
        }
    }

    /// Changes a device's state behind the bridge's back.
    pub(crate) fn mutate_state(&self, address: &str, f: impl FnOnce(&mut StateRecord)) {
        if let Some(device) = self.inner.lock().devices.get_mut(address) {
            f(&mut device.state);
        }
    }

    pub(crate) fn state(&self, address: &str) -> Option<StateRecord> {
        self.inner
            .lock()
            .devices
            .get(address)
            .map(|d| d.state.clone())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub(crate) fn calls_to(&self, address: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.address() == address)
            .collect()
    }

    pub(crate) fn posts_to(&self, address: &str) -> Vec<StatePatch> {
        self.calls_to(address)
            .into_iter()
            .filter_map(|c| match c {
                Call::PostState(_, patch) => Some(patch),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Records the call and returns how the device should answer.
    fn begin(&self, call: Call) -> (Behaviour, Option<Duration>) {
        let mut inner = self.inner.lock();
        let address = call.address().to_string();
        inner.calls.push(call);
        inner
            .devices
            .get(&address)
            .map_or((Behaviour::Unreachable, None), |d| (d.behaviour, d.delay))
    }

    async fn gate(&self, call: Call) -> Result<Behaviour, ApiError> {
        let address = call.address().to_string();
        let (behaviour, delay) = self.begin(call);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match behaviour {
            Behaviour::Unreachable => Err(ApiError::unreachable(address, "connection refused")),
            Behaviour::Hang => std::future::pending().await,
            Behaviour::ServerError => Err(ProtocolError::Status { code: 500 }.into()),
            other => Ok(other),
        }
    }

    fn with_device_mut<T>(&self, address: &str, f: impl FnOnce(&mut FakeDevice) -> T) -> Result<T, ApiError> {
        let mut inner = self.inner.lock();
        inner
            .devices
            .get_mut(address)
            .map(f)
            .ok_or_else(|| ApiError::unreachable(address, "no such host"))
    }
}

impl DeviceApi for FakeApi {
    async fn get_state(&self, address: &str) -> Result<StateRecord, ApiError> {
        self.gate(Call::GetState(address.to_string())).await?;
        self.with_device_mut(address, |d| d.state.clone())
    }

    async fn post_state(
        &self,
        address: &str,
        patch: &StatePatch,
    ) -> Result<Option<StateRecord>, ApiError> {
        let behaviour = self
            .gate(Call::PostState(address.to_string(), patch.clone()))
            .await?;
        let state = self.with_device_mut(address, |d| {
            apply_patch(&mut d.state, patch);
            if let Some(adjust) = d.after_post {
                adjust(&mut d.state);
            }
            d.state.clone()
        })?;
        Ok((behaviour != Behaviour::AckOnly).then_some(state))
    }

    async fn get_info(&self, address: &str) -> Result<InfoRecord, ApiError> {
        self.gate(Call::GetInfo(address.to_string())).await?;
        self.with_device_mut(address, |d| d.info.clone())
    }

    async fn get_capabilities(&self, address: &str) -> Result<CapabilityList, ApiError> {
        self.gate(Call::GetCapabilities(address.to_string())).await?;
        self.with_device_mut(address, |d| d.caps.clone())
    }
}

/// Applies a patch the way the firmware would.
fn apply_patch(state: &mut StateRecord, patch: &StatePatch) {
    if let Some(on) = patch.on {
        state.on = on;
    }
    if let Some(bri) = patch.bri {
        state.bri = bri;
    }
    if let Some(transition) = patch.transition {
        state.transition = transition;
    }
    if let Some(ps) = patch.ps {
        state.ps = i16::try_from(ps).unwrap_or(-1);
    }
    if let Some(pl) = patch.pl {
        state.pl = pl;
    }
    if let Some(nl) = &patch.nl {
        state.nl.on = nl.on;
        if let Some(dur) = nl.dur {
            state.nl.dur = dur;
        }
        if let Some(mode) = nl.mode {
            state.nl.mode = mode;
        }
        if let Some(tbri) = nl.tbri {
            state.nl.tbri = tbri;
        }
    }
    if let Some(udpn) = patch.udpn {
        state.udpn.send = udpn.send;
    }
    if let Some(lor) = patch.lor {
        state.lor = lor;
    }
    for seg_patch in &patch.seg {
        let index = state.seg.iter().position(|s| s.id == seg_patch.id);
        let seg = if let Some(i) = index {
            &mut state.seg[i]
        } else {
            state.seg.push(SegmentRecord {
                id: seg_patch.id,
                ..SegmentRecord::default()
            });
            let last = state.seg.len() - 1;
            &mut state.seg[last]
        };
        if let Some(fx) = seg_patch.fx {
            seg.fx = fx;
        }
        if let Some(pal) = seg_patch.pal {
            seg.pal = pal;
        }
        if let Some(sx) = seg_patch.sx {
            seg.sx = sx;
        }
        if let Some(ix) = seg_patch.ix {
            seg.ix = ix;
        }
        if let Some(col) = &seg_patch.col {
            seg.col = col
                .iter()
                .map(|c| serde_json::json!(c.to_array()))
                .collect();
        }
    }
}
