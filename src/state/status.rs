// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Presentation view of a device with codes resolved to labels.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{CatalogKind, MetadataCatalog};
use crate::registry::DeviceRecord;
use crate::state::DeviceState;

/// A device as the host displays it.
///
/// Effect, palette, preset and playlist codes are resolved through the
/// device's catalog. Codes the catalog does not know are shown as numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    /// Device name.
    pub name: String,
    /// Current address.
    pub address: String,
    /// Whether the last contact succeeded.
    pub online: bool,
    /// Time of the last successful contact.
    pub last_seen: Option<DateTime<Utc>>,
    /// Effect label.
    pub effect: String,
    /// Palette label.
    pub palette: String,
    /// Preset label, when a preset is active.
    pub preset: Option<String>,
    /// Playlist label, when a playlist is running.
    pub playlist: Option<String>,
    /// Primary color as `#RRGGBB`.
    pub color: Option<String>,
    /// Raw snapshot.
    pub state: DeviceState,
}

impl DeviceStatus {
    /// Resolves a record against a catalog.
    #[must_use]
    pub fn resolve(record: &DeviceRecord, catalog: &MetadataCatalog) -> Self {
        let state = &record.state;
        Self {
            name: record.name.clone(),
            address: record.address.clone(),
            online: record.online,
            last_seen: record.last_seen,
            effect: catalog.label_or_code(CatalogKind::Effect, state.effect),
            palette: catalog.label_or_code(CatalogKind::Palette, state.palette),
            preset: state
                .preset
                .map(|code| catalog.label_or_code(CatalogKind::Preset, code)),
            playlist: state
                .playlist
                .map(|code| catalog.label_or_code(CatalogKind::Playlist, code)),
            color: state.color.map(|c| c.to_string()),
            state: state.clone(),
        }
    }
}
