// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary frame dialect spoken on TCP port 50001.
//!
//! Every frame is five bytes: a fixed `00 01 02` header, a register and a
//! value. Writes carry the new value; a poll carries `02` in the register
//! slot and the register to read in the value slot. The receiver answers
//! each poll with one 5-byte frame whose last byte is the current value.
//!
//! | Register | Meaning | Values |
//! |----------|---------|--------|
//! | `03` | Source | see [`TCP_SOURCES`] |
//! | `04` | Volume | `0..=200`, half-dB steps from -90 dB |
//! | `09` | Power | `00` standby, `01` on |
//! | `0a` | Mute | `00` off, `01` on |

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{Error, ProtocolError, Result, TransportError};
use crate::types::{SourceSelector, StepDirection, Volume, VolumeRange};

use super::{ByteStream, ReceiverProtocol, ReceiverStatus, timed};

/// TCP port of the binary control service.
pub const TCP_PORT: u16 = 50001;

/// Built-in source table of the binary dialect, in code order.
pub const TCP_SOURCES: [(&str, u8); 8] = [
    ("Coaxial 1", 0x00),
    ("Coaxial 2", 0x01),
    ("Optical 1", 0x02),
    ("Optical 2", 0x03),
    ("Computer", 0x04),
    ("Airplay", 0x05),
    ("Dock", 0x06),
    ("Bluetooth", 0x07),
];

const FRAME_LEN: usize = 5;
const HEADER: [u8; 3] = [0x00, 0x01, 0x02];
const POLL: u8 = 0x02;
const MAX_NATIVE_VOLUME: i32 = 200;

/// Registers addressable in the binary dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    /// Input source code.
    Source = 0x03,
    /// Volume in native units.
    Volume = 0x04,
    /// Power state.
    Power = 0x09,
    /// Mute state.
    Mute = 0x0a,
}

/// Registers polled by a status read, in reply order.
const STATUS_REGISTERS: [Register; 4] = [
    Register::Volume,
    Register::Power,
    Register::Mute,
    Register::Source,
];

impl Register {
    /// Builds the frame that writes `value` to this register.
    #[must_use]
    pub const fn write_frame(self, value: u8) -> [u8; FRAME_LEN] {
        [HEADER[0], HEADER[1], HEADER[2], self as u8, value]
    }

    /// Builds the frame that polls this register.
    #[must_use]
    pub const fn poll_frame(self) -> [u8; FRAME_LEN] {
        [HEADER[0], HEADER[1], HEADER[2], POLL, self as u8]
    }
}

/// Adapter for the binary TCP dialect.
///
/// # Examples
///
/// ```no_run
/// use nadav_lib::protocol::{PacketizedAdapter, ReceiverProtocol, TCP_PORT};
/// use nadav_lib::types::VolumeRange;
///
/// # async fn example() -> nadav_lib::Result<()> {
/// let stream = tokio::net::TcpStream::connect(("192.168.1.40", TCP_PORT))
///     .await
///     .map_err(nadav_lib::error::TransportError::from)?;
/// let range = VolumeRange::half_decibels(-92, -20)?;
/// let mut adapter = PacketizedAdapter::new(stream, range, 4);
///
/// let status = adapter.fetch_status().await?;
/// println!("power: {}", status.power);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PacketizedAdapter<S> {
    stream: S,
    range: VolumeRange,
    volume_step: i32,
    io_timeout: Duration,
}

impl<S: ByteStream> PacketizedAdapter<S> {
    /// Default bound on a status read.
    pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

    /// Wraps an open stream.
    ///
    /// `volume_step` is the configured step in dB.
    #[must_use]
    pub fn new(stream: S, range: VolumeRange, volume_step: i32) -> Self {
        Self {
            stream,
            range,
            volume_step,
            io_timeout: Self::DEFAULT_IO_TIMEOUT,
        }
    }

    /// Sets the bound on each read and write.
    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        tracing::debug!(frame = ?bytes, "sending frame");
        timed(self.io_timeout, self.stream.write_all(bytes)).await?;
        timed(self.io_timeout, self.stream.flush()).await?;
        Ok(())
    }

    async fn write_register(&mut self, register: Register, value: u8) -> Result<()> {
        self.send(&register.write_frame(value)).await
    }

    /// Discards bytes the receiver pushed since the last read.
    async fn drain_pending(&mut self) -> Result<()> {
        let mut scratch = [0u8; 64];
        loop {
            match tokio::time::timeout(Duration::ZERO, self.stream.read(&mut scratch)).await {
                Ok(Ok(0)) => return Err(TransportError::Closed.into()),
                Ok(Ok(n)) => tracing::trace!(bytes = n, "discarding unsolicited bytes"),
                Ok(Err(e)) => return Err(TransportError::Io(e).into()),
                Err(_) => return Ok(()),
            }
        }
    }

    async fn set_native_volume(&mut self, native: i32) -> Result<()> {
        let value = u8::try_from(native.clamp(0, MAX_NATIVE_VOLUME)).unwrap_or(u8::MAX);
        self.write_register(Register::Volume, value).await
    }
}

/// Decodes the four status replies.
///
/// # Errors
///
/// Returns `ProtocolError` for a short reply, an out-of-range value or a
/// source code outside [`TCP_SOURCES`].
fn parse_status(
    reply: &[u8],
    range: &VolumeRange,
) -> std::result::Result<ReceiverStatus, ProtocolError> {
    let expected = FRAME_LEN * STATUS_REGISTERS.len();
    if reply.len() < expected {
        return Err(ProtocolError::ShortFrame {
            expected,
            actual: reply.len(),
        });
    }

    let mut values = reply
        .chunks_exact(FRAME_LEN)
        .map(|frame| frame[FRAME_LEN - 1]);
    let mut next = || values.next().unwrap_or_default();
    let (volume, power, mute, source) = (next(), next(), next(), next());

    if i32::from(volume) > MAX_NATIVE_VOLUME {
        return Err(ProtocolError::InvalidValue {
            field: "volume".to_string(),
            message: format!("native volume {volume} above {MAX_NATIVE_VOLUME}"),
        });
    }
    let source = TCP_SOURCES
        .iter()
        .find(|(_, code)| *code == source)
        .map(|(name, _)| (*name).to_string())
        .ok_or(ProtocolError::UnknownSourceCode(source))?;

    Ok(ReceiverStatus {
        power: parse_flag("power", power)?,
        muted: Some(parse_flag("mute", mute)?),
        volume: Some(range.to_percent(i32::from(volume))),
        source: Some(source),
    })
}

fn parse_flag(field: &str, value: u8) -> std::result::Result<bool, ProtocolError> {
    match value {
        0x00 => Ok(false),
        0x01 => Ok(true),
        other => Err(ProtocolError::InvalidValue {
            field: field.to_string(),
            message: format!("expected 00 or 01, got {other:#04x}"),
        }),
    }
}

fn source_code(name: &str) -> Option<u8> {
    TCP_SOURCES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, code)| *code)
}

#[async_trait]
impl<S: ByteStream> ReceiverProtocol for PacketizedAdapter<S> {
    async fn source_list(&mut self) -> Result<Vec<String>> {
        Ok(TCP_SOURCES
            .iter()
            .map(|(name, _)| (*name).to_string())
            .collect())
    }

    async fn fetch_status(&mut self) -> Result<ReceiverStatus> {
        self.drain_pending().await?;

        let polls: Vec<u8> = STATUS_REGISTERS
            .iter()
            .flat_map(|register| register.poll_frame())
            .collect();
        self.send(&polls).await?;

        let mut reply = [0u8; FRAME_LEN * STATUS_REGISTERS.len()];
        timed(self.io_timeout, self.stream.read_exact(&mut reply)).await?;
        tracing::debug!(reply = ?reply, "received status frames");

        Ok(parse_status(&reply, &self.range)?)
    }

    async fn set_power(&mut self, on: bool) -> Result<()> {
        self.write_register(Register::Power, u8::from(on)).await
    }

    async fn set_volume(&mut self, volume: Volume) -> Result<()> {
        let native = self.range.to_native(volume);
        self.set_native_volume(native).await
    }

    async fn step_volume(&mut self, direction: StepDirection, current: Volume) -> Result<()> {
        let native = self.range.stepped(current, direction, self.volume_step);
        self.set_native_volume(native).await
    }

    async fn set_mute(&mut self, muted: bool) -> Result<()> {
        self.write_register(Register::Mute, u8::from(muted)).await
    }

    async fn select_source(&mut self, source: &SourceSelector) -> Result<()> {
        let code = match source {
            SourceSelector::Code(code) => *code,
            SourceSelector::Name(name) => {
                source_code(name).ok_or_else(|| Error::SourceNotFound(name.clone()))?
            }
        };
        self.write_register(Register::Source, code).await
    }

    async fn ping(&mut self) -> Result<()> {
        self.fetch_status().await.map(|_| ())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "error closing TCP stream");
        }
    }
}
