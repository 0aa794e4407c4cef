// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability documents: `/json`, `/json/fxdata` and `/presets.json`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{InfoRecord, StateRecord};
use crate::error::ProtocolError;

/// The combined `/json` document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FullDocument {
    /// Live state.
    pub state: StateRecord,
    /// Device information.
    pub info: InfoRecord,
    /// Effect names, indexed by effect code.
    pub effects: Vec<String>,
    /// Palette names, indexed by palette code.
    pub palettes: Vec<String>,
}

/// One entry of `/presets.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetRecord {
    /// Preset name.
    pub n: Option<String>,
    /// Present when the preset is a playlist.
    pub playlist: Option<serde_json::Value>,
}

impl PresetRecord {
    /// Returns `true` if this preset drives a playlist.
    #[must_use]
    pub fn is_playlist(&self) -> bool {
        self.playlist.as_ref().is_some_and(|p| !p.is_null())
    }
}

/// Parses `/presets.json`, keeping only named presets with a non-zero id.
///
/// # Errors
///
/// Returns `ProtocolError::Malformed` if the body is not a JSON object.
pub fn parse_presets(body: &[u8]) -> Result<BTreeMap<u16, PresetRecord>, ProtocolError> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_slice(body)?;

    let presets = raw
        .into_iter()
        .filter_map(|(key, value)| {
            let id = key.parse::<u16>().ok().filter(|id| *id > 0)?;
            let record = PresetRecord::deserialize(value).ok()?;
            record.n.as_deref().is_some_and(|n| !n.is_empty()).then_some((id, record))
        })
        .collect();

    Ok(presets)
}

/// Everything a device reports about what it can do.
///
/// Effect and palette names are positional: the index is the code.
#[derive(Debug, Clone, Default)]
pub struct CapabilityList {
    /// Device information from the same fetch.
    pub info: InfoRecord,
    /// Effect names by code.
    pub effects: Vec<String>,
    /// Palette names by code.
    pub palettes: Vec<String>,
    /// Effect metadata strings by code. Empty on firmware without fxdata.
    pub fxdata: Vec<String>,
    /// Named presets and playlists by id.
    pub presets: BTreeMap<u16, PresetRecord>,
}

impl CapabilityList {
    /// Builds a capability list from a `/json` document.
    #[must_use]
    pub fn from_document(doc: FullDocument) -> Self {
        Self {
            info: doc.info,
            effects: doc.effects,
            palettes: doc.palettes,
            fxdata: Vec::new(),
            presets: BTreeMap::new(),
        }
    }

    /// Sets the effect metadata list.
    #[must_use]
    pub fn with_fxdata(mut self, fxdata: Vec<String>) -> Self {
        self.fxdata = fxdata;
        self
    }

    /// Sets the preset map.
    #[must_use]
    pub fn with_presets(mut self, presets: BTreeMap<u16, PresetRecord>) -> Self {
        self.presets = presets;
        self
    }
}
