// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device API client.
//!
//! [`DeviceApi`] is the only place where the bridge talks to the network.
//! Every other component goes through it, which is also how tests swap in a
//! scripted fake.
//!
//! # Endpoints
//!
//! | Method | Path | Used for |
//! |--------|------|----------|
//! | `GET` | `/json/state` | Light polls, confirmatory reads |
//! | `POST` | `/json/state` | Every command |
//! | `GET` | `/json/info` | Discovery probes, full resync |
//! | `GET` | `/json` | Effect and palette names |
//! | `GET` | `/json/fxdata` | Effect metadata |
//! | `GET` | `/presets.json` | Preset and playlist names |

#[cfg(test)]
pub(crate) mod fake;
#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{HttpClient, HttpConfig};

use std::future::Future;

use crate::command::StatePatch;
use crate::error::ApiError;
use crate::response::{CapabilityList, InfoRecord, StateRecord};

/// Operations the bridge needs from a device.
///
/// `address` is `host` or `host:port`. Implementations must bound every call
/// with a timeout and must not retry; a timeout or refused connection is
/// reported as [`ApiError::Unreachable`], anything the device said that does
/// not parse as [`ApiError::Protocol`].
///
/// Implementations are cheap to clone and shared across tasks.
pub trait DeviceApi: Clone + Send + Sync + 'static {
    /// Reads the live state.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the device is unreachable or the reply is not a
    /// state document.
    fn get_state(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<StateRecord, ApiError>> + Send;

    /// Writes a partial state.
    ///
    /// Returns the echoed full state, or `None` if the firmware only
    /// acknowledged the write.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the device is unreachable, rejected the patch, or
    /// replied with something unexpected.
    fn post_state(
        &self,
        address: &str,
        patch: &StatePatch,
    ) -> impl Future<Output = Result<Option<StateRecord>, ApiError>> + Send;

    /// Reads the static device information.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the device is unreachable or the reply is not an
    /// info document.
    fn get_info(&self, address: &str)
    -> impl Future<Output = Result<InfoRecord, ApiError>> + Send;

    /// Reads everything needed to build the device's metadata catalog.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the main document cannot be fetched. Optional
    /// documents that older firmware lacks degrade to empty lists.
    fn get_capabilities(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<CapabilityList, ApiError>> + Send;
}
