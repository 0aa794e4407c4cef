// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Effect tags and the rules that derive them.

use serde::Serialize;

/// What an effect reacts to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct EffectTags {
    /// The effect draws from the selected palette.
    pub uses_palette: bool,
    /// The effect reacts to audio volume or frequency.
    pub audio_reactive: bool,
    /// The effect is designed for 2-D matrices.
    pub two_d: bool,
}

/// Derives [`EffectTags`] from an effect's metadata string.
///
/// Implement this to support firmware forks whose metadata format differs.
pub trait EffectTagRules: Send + Sync {
    /// Returns the tags for one effect metadata string.
    fn tags(&self, fxdata: &str) -> EffectTags;
}

/// Rules for the `/json/fxdata` format.
///
/// Each entry reads `params;colors;palette;flags`. A non-empty palette
/// section means the effect uses the palette. In the flags section `2`
/// marks a 2-D effect, `v` a volume-reactive one and `f` a
/// frequency-reactive one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FxDataRules;

impl EffectTagRules for FxDataRules {
    fn tags(&self, fxdata: &str) -> EffectTags {
        // Everything after '@' is the metadata proper in older builds.
        let meta = fxdata.split_once('@').map_or(fxdata, |(_, m)| m);
        let mut sections = meta.split(';');
        let _params = sections.next();
        let _colors = sections.next();
        let palette = sections.next().unwrap_or_default();
        let flags = sections.next().unwrap_or_default();

        EffectTags {
            uses_palette: !palette.trim().is_empty(),
            audio_reactive: flags.contains('v') || flags.contains('f'),
            two_d: flags.contains('2'),
        }
    }
}
