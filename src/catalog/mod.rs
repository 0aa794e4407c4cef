// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metadata catalog.
//!
//! Maps effect, palette, preset and playlist codes to display labels. Each
//! device gets its own catalog from its capability list; the merged catalog
//! folds them together in device-name order so that "first seen" always
//! means the same device. When devices disagree on a label the first one is
//! kept and the others are recorded as conflicts.

mod builder;
mod metadata;
mod tags;

pub use builder::{CatalogSet, RebuildReport, rebuild};
pub use metadata::{CatalogKind, MetadataCatalog, MetadataEntry};
pub use tags::{EffectTagRules, EffectTags, FxDataRules};
