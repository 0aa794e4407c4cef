// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command to patch translation.

use super::{Command, NightlightPatch, SegmentPatch, StatePatch, UdpSyncPatch};
use crate::catalog::{CatalogKind, MetadataCatalog};
use crate::error::ValueError;
use crate::state::DeviceState;
use crate::types::{Percent, TransitionTime};

/// Percentage points added or removed by [`Command::Brighten`] and
/// [`Command::Dim`].
pub const BRIGHTNESS_STEP: u8 = 10;

/// Nightlight fade mode: fade from current brightness to `tbri`.
const NIGHTLIGHT_FADE: u8 = 1;

/// Translates a command into the patch that carries it out.
///
/// `current` supplies the main segment index and the brightness that
/// relative commands start from. Codes are checked against `catalog`; an
/// empty catalog (nothing fetched yet) accepts every code.
///
/// # Errors
///
/// Returns `ValueError` if an effect, palette, preset or playlist code is not
/// in the catalog.
pub fn translate(
    command: &Command,
    current: &DeviceState,
    catalog: &MetadataCatalog,
) -> Result<StatePatch, ValueError> {
    let main = current.main_segment;
    let mut patch = StatePatch::new();

    match *command {
        Command::On { brightness } => {
            patch.on = Some(true);
            patch.bri = brightness.map(|b| Percent::clamped(b).to_native());
        }
        Command::Off => patch.on = Some(false),
        Command::FastOn | Command::FastOff => {
            patch.on = Some(matches!(command, Command::FastOn));
            patch.transition = Some(u16::from(TransitionTime::INSTANT.value()));
        }
        Command::Brighten => {
            patch.bri = Some(current.brightness.saturating_add(BRIGHTNESS_STEP).to_native());
        }
        Command::Dim => {
            patch.bri = Some(current.brightness.saturating_sub(BRIGHTNESS_STEP).to_native());
        }
        Command::SetBrightness(pct) => patch.bri = Some(Percent::clamped(pct).to_native()),
        Command::SetEffect(code) => {
            check(catalog, CatalogKind::Effect, code, ValueError::UnknownEffect)?;
            patch.seg.push(SegmentPatch {
                fx: Some(code),
                ..SegmentPatch::new(main)
            });
        }
        Command::SetPalette(code) => {
            check(catalog, CatalogKind::Palette, code, ValueError::UnknownPalette)?;
            patch.seg.push(SegmentPatch {
                pal: Some(code),
                ..SegmentPatch::new(main)
            });
        }
        Command::LoadPreset(code) => {
            check(catalog, CatalogKind::Preset, code, ValueError::UnknownPreset)?;
            patch.ps = Some(code);
        }
        Command::SetColor(color) => patch.seg.push(SegmentPatch {
            col: Some(vec![color]),
            ..SegmentPatch::new(main)
        }),
        Command::SetSpeed(pct) => patch.seg.push(SegmentPatch {
            sx: Some(Percent::clamped(pct).to_native()),
            ..SegmentPatch::new(main)
        }),
        Command::SetIntensity(pct) => patch.seg.push(SegmentPatch {
            ix: Some(Percent::clamped(pct).to_native()),
            ..SegmentPatch::new(main)
        }),
        Command::SetTransition(units) => {
            patch.transition = Some(u16::from(TransitionTime::clamped(units).value()));
        }
        Command::Nightlight(0) | Command::NightlightOff => {
            patch.nl = Some(NightlightPatch {
                on: false,
                ..NightlightPatch::default()
            });
        }
        Command::Nightlight(minutes) => {
            // The timer only runs while the light is on.
            patch.on = Some(true);
            patch.nl = Some(NightlightPatch {
                on: true,
                dur: Some(minutes),
                mode: Some(NIGHTLIGHT_FADE),
                tbri: Some(0),
            });
        }
        Command::SetSync(mode) => {
            patch.udpn = Some(UdpSyncPatch {
                send: mode.sends(),
            });
        }
        Command::SetLiveOverride(enabled) => patch.lor = Some(u8::from(enabled)),
        Command::StartPlaylist(code) => {
            check(catalog, CatalogKind::Playlist, code, ValueError::UnknownPlaylist)?;
            patch.pl = Some(i16::try_from(code).map_err(|_| ValueError::OutOfRange {
                min: 1,
                max: i64::from(i16::MAX),
                actual: i64::from(code),
            })?);
        }
        Command::StopPlaylist => patch.pl = Some(-1),
    }

    Ok(patch)
}

fn check(
    catalog: &MetadataCatalog,
    kind: CatalogKind,
    code: u16,
    unknown: fn(u16) -> ValueError,
) -> Result<(), ValueError> {
    if catalog.is_empty() || catalog.contains(kind, code) {
        Ok(())
    } else {
        Err(unknown(code))
    }
}
