// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for bridge notifications.
//!
//! The [`EventBus`] fans [`BridgeEvent`]s out to every subscriber over a
//! tokio broadcast channel. Obtain a receiver with
//! [`Bridge::subscribe`](crate::Bridge::subscribe).

mod bridge_event;
mod event_bus;

pub use bridge_event::BridgeEvent;
pub use event_bus::EventBus;
