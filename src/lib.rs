// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `wled_bridge` - mirror and control a fleet of WLED LED controllers.
//!
//! This library sits between a home-automation host and the controllers'
//! HTTP/JSON API. It keeps a table of devices and their last known state,
//! resolves effect, palette and preset codes into labels, and turns host
//! commands into state pushes that are confirmed by reading the device
//! back.
//!
//! # Features
//!
//! - **Discovery**: static `name:address` entries plus a bounded sweep of
//!   the local subnet
//! - **State cache**: one record per device, updated by polls and commands
//! - **Metadata catalog**: effect, palette, preset and playlist labels
//!   merged across devices, with per-device catalogs for validation
//! - **Commands**: power, brightness, effects, palettes, presets, colors,
//!   speed, intensity, transitions, nightlight, sync, live override and
//!   playlists, for one device or the whole fleet
//! - **Polling**: independent light refresh and full resync timers
//! - **Events**: a broadcast stream of everything that changed
//!
//! # Quick Start
//!
//! ```no_run
//! use wled_bridge::{BridgeConfig, Command, HttpBridge};
//!
//! #[tokio::main]
//! async fn main() -> wled_bridge::Result<()> {
//!     let config = BridgeConfig::new().with_devices("desk:192.168.1.40");
//!     let bridge = HttpBridge::http(config)?;
//!
//!     // Register, discover, read everything once and start polling
//!     bridge.start().await;
//!
//!     bridge.execute("desk", Command::SetEffect(2)).await?;
//!     bridge.apply_to_all(Command::Off).await;
//!
//!     println!("{:?}", bridge.summarize());
//!     bridge.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Events
//!
//! ```no_run
//! use wled_bridge::{BridgeConfig, HttpBridge};
//! use wled_bridge::event::BridgeEvent;
//!
//! # async fn example() -> wled_bridge::Result<()> {
//! let bridge = HttpBridge::http(BridgeConfig::new())?;
//! let mut events = bridge.subscribe();
//!
//! bridge.start().await;
//! while let Ok(event) = events.recv().await {
//!     if let BridgeEvent::OnlineChanged { device, online } = event {
//!         println!("{device} online: {online}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Every operation returns a typed [`Error`]; [`Error::kind`] gives a
//! stable [`ErrorKind`] hosts can show to users. Fleet-wide operations never
//! stop at the first failing device.

pub mod aggregate;
mod bridge;
pub mod catalog;
pub mod command;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod event;
pub mod protocol;
pub mod registry;
pub mod response;
pub mod scheduler;
pub mod state;
pub mod types;

pub use aggregate::{AggregateView, BatchOutcome};
#[cfg(feature = "http")]
pub use bridge::HttpBridge;
pub use bridge::{Bridge, ConfigReport, DiscoverReport, StartReport};
pub use catalog::{CatalogKind, CatalogSet, MetadataCatalog};
pub use command::Command;
pub use config::BridgeConfig;
pub use error::{ApiError, ConfigError, Error, ErrorKind, ProtocolError, Result, ValueError};
pub use event::BridgeEvent;
#[cfg(feature = "http")]
pub use protocol::{HttpClient, HttpConfig};
pub use protocol::DeviceApi;
pub use state::{DeviceState, DeviceStatus};
pub use types::{Nightlight, Percent, RgbColor, SyncMode, TransitionTime};
