// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Receiver lifecycle: configuration, connection supervision and the
//! multi-device manager.
//!
//! # Overview
//!
//! - [`DeviceConfig`] describes how to reach one receiver and its volume
//!   limits and input names.
//! - [`ReceiverDevice`] owns the connection to one receiver, retries
//!   commands across reconnects and keeps the [`DeviceState`](crate::state::DeviceState).
//! - [`spawn_watchdog`] reconnects a receiver that dropped off.
//! - [`DeviceManager`] holds many receivers behind one event bus.
//!
//! # Examples
//!
//! ## A single receiver
//!
//! ```no_run
//! use nadav_lib::manager::{ConnectionPolicy, DeviceConfig, ReceiverDevice};
//!
//! # async fn example() -> nadav_lib::Result<()> {
//! let config = DeviceConfig::telnet("192.168.1.41", 23).with_name("Kitchen");
//! let mut receiver = ReceiverDevice::new(config, ConnectionPolicy::default())?;
//!
//! receiver.try_connect().await?;
//! receiver.try_turn_on().await?;
//! receiver.try_volume_up().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Watching state through the manager
//!
//! ```no_run
//! use nadav_lib::manager::{DeviceConfig, DeviceManager};
//!
//! # async fn example() -> nadav_lib::Result<()> {
//! let manager = DeviceManager::new();
//! let id = manager.add_device(DeviceConfig::tcp("192.168.1.40")).await?;
//!
//! if let Some(mut state_rx) = manager.watch_device(&id).await {
//!     tokio::spawn(async move {
//!         while state_rx.changed().await.is_ok() {
//!             let state = state_rx.borrow();
//!             println!("volume {}", state.volume());
//!         }
//!     });
//! }
//! manager.connect(&id).await?;
//! # Ok(())
//! # }
//! ```

mod connection;
mod device_config;
mod device_manager;
mod managed_device;
mod receiver;
mod watchdog;

pub use connection::ConnectionManager;
pub use device_config::{
    ConnectionPolicy, ConnectionType, DEFAULT_MAX_VOLUME, DEFAULT_MIN_VOLUME, DEFAULT_PORT,
    DEFAULT_SERIAL_PORT, DEFAULT_VOLUME_STEP, DeviceConfig, MAX_VOLUME_STEP, VOLUME_LIMIT_CEILING,
    VOLUME_LIMIT_FLOOR,
};
pub use device_manager::DeviceManager;
pub use receiver::ReceiverDevice;
pub use watchdog::{reconnect_burst, spawn_watchdog};
