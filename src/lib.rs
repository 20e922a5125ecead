// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `NadAV` Lib - A Rust library to control NAD AV receivers and amplifiers.
//!
//! This library provides async APIs to drive NAD receivers over their three
//! control transports and to expose them as media player entities.
//!
//! # Supported Transports
//!
//! - **TCP** (port 50001): binary 5-byte frames used by the network-enabled
//!   receivers, with a fixed set of named inputs
//! - **Telnet** (port 23): the `Main.Attribute=Value` line protocol
//! - **RS-232**: the same line protocol over a serial port at 115200 baud
//!   (requires the default `serial` feature)
//!
//! # Features
//!
//! - **Power, volume, mute and input control** with percent volume scaled to
//!   each receiver's native range
//! - **Automatic recovery**: commands are retried across a reconnect and a
//!   watchdog reconnects receivers that dropped off
//! - **State tracking**: optimistic updates confirmed by a status refresh,
//!   observable through watch channels and a broadcast event bus
//! - **Command dispatch** of platform media player commands with HTTP-style
//!   status codes
//! - **Persistence** of receiver configurations as JSON
//!
//! # Quick Start
//!
//! ## Single Receiver
//!
//! ```no_run
//! use nadav_lib::manager::{ConnectionPolicy, DeviceConfig, ReceiverDevice};
//! use nadav_lib::Volume;
//!
//! #[tokio::main]
//! async fn main() -> nadav_lib::Result<()> {
//!     let config = DeviceConfig::tcp("192.168.1.40").with_name("Living Room");
//!     let mut receiver = ReceiverDevice::new(config, ConnectionPolicy::default())?;
//!
//!     receiver.try_connect().await?;
//!     receiver.try_turn_on().await?;
//!     receiver.try_set_volume(Volume::new(35)?).await?;
//!     receiver.try_select_source("Bluetooth").await?;
//!
//!     println!("{:?}", receiver.state());
//!     Ok(())
//! }
//! ```
//!
//! ## Serial Receiver with Named Inputs
//!
//! ```no_run
//! use nadav_lib::manager::{ConnectionPolicy, DeviceConfig, ReceiverDevice};
//!
//! #[tokio::main]
//! async fn main() -> nadav_lib::Result<()> {
//!     let sources = [(1, "CD"), (2, "Tuner"), (5, "TV")].into_iter().collect();
//!     let config = DeviceConfig::serial("/dev/ttyUSB0")
//!         .with_volume_limits(-80, -10)
//!         .with_sources(sources);
//!
//!     let mut receiver = ReceiverDevice::new(config, ConnectionPolicy::default())?;
//!     receiver.try_connect().await?;
//!     receiver.try_mute(true).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Many Receivers
//!
//! ```no_run
//! use nadav_lib::dispatch::MediaPlayerCommand;
//! use nadav_lib::manager::DeviceManager;
//! use nadav_lib::persistence::ConfigStore;
//!
//! #[tokio::main]
//! async fn main() -> nadav_lib::Result<()> {
//!     let store = ConfigStore::open("/var/lib/nadav/config.json")?;
//!     let manager = DeviceManager::new();
//!     let ids = manager.load_from(&store, true).await?;
//!
//!     for id in &ids {
//!         let status = manager.execute(id, &MediaPlayerCommand::new("ON")).await;
//!         println!("{id}: {status}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod manager;
pub mod persistence;
pub mod protocol;
pub mod state;
pub mod types;

pub use dispatch::{CommandId, EntityDescriptor, MediaPlayerCommand, StatusCode, handle_command};
pub use error::{ConfigError, Error, ProtocolError, Result, TransportError, ValueError};
pub use event::{DeviceEvent, DeviceId, EventBus};
pub use manager::{ConnectionPolicy, ConnectionType, DeviceConfig, DeviceManager, ReceiverDevice};
pub use persistence::ConfigStore;
pub use protocol::{Connector, DialConnector, ReceiverProtocol, ReceiverStatus, probe};
pub use state::{ConnectionStatus, DeviceState, MediaState, StateUpdate};
pub use types::{SourceMap, SourceSelector, StepDirection, Volume};
