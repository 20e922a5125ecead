// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Background reconnection for dropped receivers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::device_config::ConnectionPolicy;
use super::receiver::ReceiverDevice;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Starts a task that reconnects `device` whenever it is found disconnected.
///
/// Every `watchdog_interval` the task pings a connected device, dropping the
/// link if the receiver no longer answers. If the device is then
/// disconnected, it makes up to `max_reconnect_attempts` attempts spaced by
/// `reconnect_delay`. Failures are logged and retried on the next tick.
/// The task runs until the handle is aborted.
#[must_use = "dropping the handle does not stop the watchdog; abort it instead"]
pub fn spawn_watchdog(device: Arc<Mutex<ReceiverDevice>>, policy: ConnectionPolicy) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(policy.watchdog_interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            check_link(&device).await;
            reconnect_burst(&device, &policy).await;
        }
    })
}

async fn check_link(device: &Mutex<ReceiverDevice>) {
    let mut device = device.lock().await;
    if device.is_connected()
        && let Err(e) = device.try_ping().await
    {
        tracing::debug!(device = %device.id(), error = %e, "liveness check failed");
    }
}

/// Tries to reconnect a disconnected device.
///
/// Returns `true` if the device is connected afterwards. The lock is only
/// held for the duration of each attempt.
pub async fn reconnect_burst(device: &Mutex<ReceiverDevice>, policy: &ConnectionPolicy) -> bool {
    for attempt in 1..=policy.max_reconnect_attempts {
        {
            let mut device = device.lock().await;
            if device.is_connected() {
                return true;
            }
            match device.try_connect().await {
                Ok(()) => {
                    tracing::info!(device = %device.id(), attempt, "reconnected");
                    return true;
                }
                Err(e) => tracing::warn!(
                    device = %device.id(),
                    attempt,
                    attempts = policy.max_reconnect_attempts,
                    error = %e,
                    "reconnect attempt failed"
                ),
            }
        }
        if attempt < policy.max_reconnect_attempts {
            tokio::time::sleep(policy.reconnect_delay).await;
        }
    }

    let device = device.lock().await;
    let connected = device.is_connected();
    if !connected {
        tracing::error!(
            device = %device.id(),
            attempts = policy.max_reconnect_attempts,
            "receiver still unreachable, waiting for next check"
        );
    }
    connected
}
