// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event system for receiver connection and state changes.
//!
//! The [`EventBus`] fans [`DeviceEvent`]s out to any number of subscribers
//! over a tokio broadcast channel.
//!
//! # Examples
//!
//! ```
//! use nadav_lib::event::{DeviceEvent, DeviceId, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(DeviceEvent::device_added(DeviceId::new("192.168.1.40_53")));
//! assert!(rx.try_recv().unwrap().is_lifecycle());
//! ```

mod device_event;
mod device_id;
mod event_bus;

pub use device_event::DeviceEvent;
pub use device_id::DeviceId;
pub use event_bus::EventBus;
