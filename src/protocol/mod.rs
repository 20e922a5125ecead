// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire dialects for talking to NAD receivers.
//!
//! NAD receivers speak one of two dialects depending on how they are reached:
//!
//! - [`PacketizedAdapter`]: fixed 5-byte binary frames on TCP port 50001
//!   (network streamers such as the C 338 / C 368).
//! - [`QueryResponseAdapter`]: `Main.<Attribute>` text lines over Telnet or
//!   an RS-232 serial link.
//!
//! Both implement [`ReceiverProtocol`], so the rest of the crate is unaware of
//! which dialect is in use once a [`Connector`] has opened the transport.

mod connector;
mod packetized;
mod query_response;

pub use connector::{Connector, DialConnector, SERIAL_BAUD_RATE, probe};
pub use packetized::{PacketizedAdapter, Register, TCP_PORT, TCP_SOURCES};
pub use query_response::QueryResponseAdapter;

use std::future::Future;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Result, TransportError};
use crate::types::{SourceSelector, StepDirection, Volume};

/// Byte stream an adapter can run on: a TCP socket, a serial port or a test pipe.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ByteStream for T {}

/// Receiver status in normalized units.
///
/// Line-dialect receivers only answer power queries in standby, so a status
/// read from a powered-off receiver carries power alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReceiverStatus {
    /// Power state.
    pub power: bool,
    /// Mute state, if it was read.
    pub muted: Option<bool>,
    /// Volume in percent, if it was read.
    pub volume: Option<Volume>,
    /// Current source name; `None` if not read or not mapped.
    pub source: Option<String>,
}

impl ReceiverStatus {
    /// Creates a status that only carries the power state.
    #[must_use]
    pub fn power_only(power: bool) -> Self {
        Self {
            power,
            ..Self::default()
        }
    }

    /// Returns `true` if only the power state was read.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.muted.is_none() && self.volume.is_none()
    }
}

/// Capability interface shared by both wire dialects.
///
/// Adapters own their transport. Any I/O failure surfaces as
/// [`Error::Transport`](crate::Error::Transport); the caller decides whether
/// to reconnect and retry.
#[async_trait]
pub trait ReceiverProtocol: Send {
    /// Returns the names of the selectable sources.
    async fn source_list(&mut self) -> Result<Vec<String>>;

    /// Reads power, mute, volume and source from the receiver.
    async fn fetch_status(&mut self) -> Result<ReceiverStatus>;

    /// Switches the receiver on or to standby.
    async fn set_power(&mut self, on: bool) -> Result<()>;

    /// Sets an absolute volume.
    async fn set_volume(&mut self, volume: Volume) -> Result<()>;

    /// Moves the volume one step from `current`.
    async fn step_volume(&mut self, direction: StepDirection, current: Volume) -> Result<()>;

    /// Mutes or unmutes.
    async fn set_mute(&mut self, muted: bool) -> Result<()>;

    /// Selects an input source.
    async fn select_source(&mut self, source: &SourceSelector) -> Result<()>;

    /// Performs the cheapest round trip that proves the receiver answers.
    async fn ping(&mut self) -> Result<()>;

    /// Closes the transport. Errors are ignored.
    async fn close(&mut self);
}

/// Runs an I/O future with a deadline, mapping failures to [`TransportError`].
pub(crate) async fn timed<T>(
    limit: Duration,
    fut: impl Future<Output = io::Result<T>>,
) -> std::result::Result<T, TransportError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Err(TransportError::Closed),
        Ok(Err(e)) => Err(TransportError::Io(e)),
        Err(_) => Err(TransportError::Timeout(
            u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        )),
    }
}
