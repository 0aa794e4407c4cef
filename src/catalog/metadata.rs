// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Code-to-label tables for effects, palettes, presets and playlists.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::tags::{EffectTagRules, EffectTags};
use crate::response::CapabilityList;

/// Labels the firmware uses for unused effect slots.
const RESERVED_LABELS: [&str; 2] = ["RSVD", "-"];

/// Which table a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CatalogKind {
    /// Effect codes (`fx`).
    Effect,
    /// Palette codes (`pal`).
    Palette,
    /// Preset ids (`ps`).
    Preset,
    /// Presets that drive a playlist (`pl`).
    Playlist,
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Effect => f.write_str("effect"),
            Self::Palette => f.write_str("palette"),
            Self::Preset => f.write_str("preset"),
            Self::Playlist => f.write_str("playlist"),
        }
    }
}

/// One code and what it is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    /// Numeric code.
    pub code: u16,
    /// Label of the first device that reported this code.
    pub label: String,
    /// Effect tags. Always default for non-effects.
    pub tags: EffectTags,
    /// Different labels other devices reported for the same code.
    pub conflicts: Vec<String>,
}

impl MetadataEntry {
    /// Creates an entry without tags or conflicts.
    #[must_use]
    pub fn new(code: u16, label: impl Into<String>) -> Self {
        Self {
            code,
            label: label.into(),
            tags: EffectTags::default(),
            conflicts: Vec::new(),
        }
    }

    /// Sets the effect tags.
    #[must_use]
    pub fn with_tags(mut self, tags: EffectTags) -> Self {
        self.tags = tags;
        self
    }
}

/// A set of code tables, either for one device or merged across devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetadataCatalog {
    effects: BTreeMap<u16, MetadataEntry>,
    palettes: BTreeMap<u16, MetadataEntry>,
    presets: BTreeMap<u16, MetadataEntry>,
    playlists: BTreeMap<u16, MetadataEntry>,
}

impl MetadataCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one device's catalog from its capability list.
    ///
    /// Reserved and empty effect names are skipped; the remaining codes keep
    /// their position in the firmware's list.
    #[must_use]
    pub fn from_capabilities(caps: &CapabilityList, rules: &dyn EffectTagRules) -> Self {
        let mut catalog = Self::new();

        for (code, name) in positional(&caps.effects) {
            let tags = caps
                .fxdata
                .get(usize::from(code))
                .map(|meta| rules.tags(meta))
                .unwrap_or_default();
            catalog
                .effects
                .insert(code, MetadataEntry::new(code, name).with_tags(tags));
        }

        for (code, name) in positional(&caps.palettes) {
            catalog.palettes.insert(code, MetadataEntry::new(code, name));
        }

        for (id, preset) in &caps.presets {
            let Some(name) = preset.n.as_deref() else {
                continue;
            };
            catalog.presets.insert(*id, MetadataEntry::new(*id, name));
            if preset.is_playlist() {
                catalog.playlists.insert(*id, MetadataEntry::new(*id, name));
            }
        }

        catalog
    }

    /// Returns `true` if no table has any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
            && self.palettes.is_empty()
            && self.presets.is_empty()
            && self.playlists.is_empty()
    }

    /// Returns the entry for a code.
    #[must_use]
    pub fn entry(&self, kind: CatalogKind, code: u16) -> Option<&MetadataEntry> {
        self.table(kind).get(&code)
    }

    /// Returns `true` if the code is known.
    #[must_use]
    pub fn contains(&self, kind: CatalogKind, code: u16) -> bool {
        self.table(kind).contains_key(&code)
    }

    /// Returns the label for a code.
    #[must_use]
    pub fn label(&self, kind: CatalogKind, code: u16) -> Option<&str> {
        self.entry(kind, code).map(|e| e.label.as_str())
    }

    /// Returns the label for a code, or the code itself when unknown.
    #[must_use]
    pub fn label_or_code(&self, kind: CatalogKind, code: u16) -> String {
        self.label(kind, code)
            .map_or_else(|| code.to_string(), ToString::to_string)
    }

    /// Iterates over one table in code order.
    pub fn entries(&self, kind: CatalogKind) -> impl Iterator<Item = &MetadataEntry> {
        self.table(kind).values()
    }

    /// Returns the number of entries in one table.
    #[must_use]
    pub fn len(&self, kind: CatalogKind) -> usize {
        self.table(kind).len()
    }

    /// Returns the total number of recorded label conflicts.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        [
            CatalogKind::Effect,
            CatalogKind::Palette,
            CatalogKind::Preset,
            CatalogKind::Playlist,
        ]
        .into_iter()
        .flat_map(|kind| self.entries(kind))
        .map(|e| e.conflicts.len())
        .sum()
    }

    /// Folds another catalog into this one.
    ///
    /// Codes not yet present are copied. For codes already present with a
    /// different label, the other label is appended to `conflicts` unless it
    /// is already listed. Returns the number of new conflicts.
    pub fn absorb(&mut self, other: &Self, source: &str) -> usize {
        let mut added = 0;
        for kind in [
            CatalogKind::Effect,
            CatalogKind::Palette,
            CatalogKind::Preset,
            CatalogKind::Playlist,
        ] {
            let table = self.table_mut(kind);
            for entry in other.table(kind).values() {
                match table.get_mut(&entry.code) {
                    None => {
                        let mut copy = entry.clone();
                        copy.conflicts.clear();
                        table.insert(entry.code, copy);
                    }
                    Some(existing) => {
                        if existing.label != entry.label && !existing.conflicts.contains(&entry.label) {
                            tracing::warn!(
                                kind = %kind,
                                code = entry.code,
                                label = %existing.label,
                                other = %entry.label,
                                device = %source,
                                "Conflicting catalog label"
                            );
                            existing.conflicts.push(entry.label.clone());
                            added += 1;
                        }
                    }
                }
            }
        }
        added
    }

    /// Inserts an entry, replacing any previous one with the same code.
    pub fn insert(&mut self, kind: CatalogKind, entry: MetadataEntry) {
        self.table_mut(kind).insert(entry.code, entry);
    }

    fn table(&self, kind: CatalogKind) -> &BTreeMap<u16, MetadataEntry> {
        match kind {
            CatalogKind::Effect => &self.effects,
            CatalogKind::Palette => &self.palettes,
            CatalogKind::Preset => &self.presets,
            CatalogKind::Playlist => &self.playlists,
        }
    }

    fn table_mut(&mut self, kind: CatalogKind) -> &mut BTreeMap<u16, MetadataEntry> {
        match kind {
            CatalogKind::Effect => &mut self.effects,
            CatalogKind::Palette => &mut self.palettes,
            CatalogKind::Preset => &mut self.presets,
            CatalogKind::Playlist => &mut self.playlists,
        }
    }
}

/// Yields `(code, name)` for every usable name in a positional list.
fn positional(names: &[String]) -> impl Iterator<Item = (u16, &str)> {
    names.iter().enumerate().filter_map(|(index, name)| {
        let name = name.trim();
        if name.is_empty() || RESERVED_LABELS.contains(&name) {
            return None;
        }
        u16::try_from(index).ok().map(|code| (code, name))
    })
}
