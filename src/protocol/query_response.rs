// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line dialect spoken over Telnet and RS-232.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::command::{
    Attribute, Command, LINE_TERMINATOR, MainCommand, parse_on_off, parse_source_code,
    parse_volume_db, reply_value,
};
use crate::error::{Error, Result};
use crate::types::{SourceMap, SourceSelector, StepDirection, Volume, VolumeRange};

use super::{ByteStream, ReceiverProtocol, ReceiverStatus, timed};

/// Adapter for the `Main.<Attribute>` line dialect.
///
/// Every command is a round trip: the adapter writes one framed line and
/// reads until the receiver echoes the addressed attribute. Other lines
/// (front-panel changes, IR activity) are skipped.
///
/// # Examples
///
/// ```no_run
/// use nadav_lib::protocol::{QueryResponseAdapter, ReceiverProtocol};
/// use nadav_lib::types::{SourceMap, VolumeRange};
///
/// # async fn example() -> nadav_lib::Result<()> {
/// let stream = tokio::net::TcpStream::connect(("192.168.1.41", 23))
///     .await
///     .map_err(nadav_lib::error::TransportError::from)?;
/// let sources: SourceMap = [(1, "CD"), (2, "Tuner")].into_iter().collect();
/// let mut adapter = QueryResponseAdapter::new(stream, VolumeRange::decibels(-92, -20)?, sources);
///
/// adapter.set_power(true).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueryResponseAdapter<S> {
    stream: BufReader<S>,
    range: VolumeRange,
    sources: SourceMap,
    io_timeout: Duration,
}

impl<S: ByteStream> QueryResponseAdapter<S> {
    /// Default bound on one command round trip.
    pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

    /// Wraps an open stream.
    #[must_use]
    pub fn new(stream: S, range: VolumeRange, sources: SourceMap) -> Self {
        Self {
            stream: BufReader::new(stream),
            range,
            sources,
            io_timeout: Self::DEFAULT_IO_TIMEOUT,
        }
    }

    /// Sets the bound on each command round trip.
    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Sends `command` and returns the value of its reply.
    async fn transact(&mut self, command: &MainCommand) -> Result<String> {
        let prefix = command.reply_prefix();
        tracing::debug!(command = %command.to_line(), "sending line");

        timed(self.io_timeout, self.stream.write_all(&command.to_wire())).await?;
        timed(self.io_timeout, self.stream.flush()).await?;

        let value = timed(self.io_timeout, read_reply(&mut self.stream, &prefix)).await?;

        tracing::debug!(reply = %value, "received {prefix}");
        Ok(value)
    }

    async fn query(&mut self, attribute: Attribute) -> Result<String> {
        self.transact(&MainCommand::query(attribute)).await
    }
}

/// Reads lines until one answers `prefix`.
async fn read_reply<S: ByteStream>(stream: &mut BufReader<S>, prefix: &str) -> io::Result<String> {
    let mut raw = Vec::new();
    loop {
        raw.clear();
        if stream.read_until(LINE_TERMINATOR, &mut raw).await? == 0 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        for line in raw.split(|b| *b == b'\n').map(clean_line) {
            if let Some(value) = reply_value(&line, prefix) {
                return Ok(value.to_string());
            }
            if !line.is_empty() {
                tracing::trace!(%line, "skipping unsolicited line");
            }
        }
    }
}

/// Decodes a raw line, dropping control bytes and Telnet negotiation noise.
fn clean_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

#[async_trait]
impl<S: ByteStream> ReceiverProtocol for QueryResponseAdapter<S> {
    async fn source_list(&mut self) -> Result<Vec<String>> {
        Ok(self.sources.names())
    }

    async fn fetch_status(&mut self) -> Result<ReceiverStatus> {
        let power = parse_on_off("power", &self.query(Attribute::Power).await?)?;
        if !power {
            return Ok(ReceiverStatus::power_only(false));
        }

        let muted = parse_on_off("mute", &self.query(Attribute::Mute).await?)?;
        let db = parse_volume_db(&self.query(Attribute::Volume).await?)?;
        let source = if self.sources.is_empty() {
            None
        } else {
            let code = parse_source_code(&self.query(Attribute::Source).await?)?;
            self.sources.name_for(code).map(str::to_string)
        };

        Ok(ReceiverStatus {
            power,
            muted: Some(muted),
            volume: Some(self.range.to_percent(db)),
            source,
        })
    }

    async fn set_power(&mut self, on: bool) -> Result<()> {
        self.transact(&MainCommand::set_power(on)).await.map(|_| ())
    }

    async fn set_volume(&mut self, volume: Volume) -> Result<()> {
        let db = self.range.to_native(volume);
        self.transact(&MainCommand::set_volume(db)).await.map(|_| ())
    }

    async fn step_volume(&mut self, direction: StepDirection, _current: Volume) -> Result<()> {
        self.transact(&MainCommand::step_volume(direction))
            .await
            .map(|_| ())
    }

    async fn set_mute(&mut self, muted: bool) -> Result<()> {
        self.transact(&MainCommand::set_mute(muted)).await.map(|_| ())
    }

    async fn select_source(&mut self, source: &SourceSelector) -> Result<()> {
        let code = match source {
            SourceSelector::Code(code) => *code,
            SourceSelector::Name(name) => self
                .sources
                .code_for(name)
                .ok_or_else(|| Error::SourceNotFound(name.clone()))?,
        };
        self.transact(&MainCommand::set_source(code)).await.map(|_| ())
    }

    async fn ping(&mut self) -> Result<()> {
        let value = self.query(Attribute::Power).await?;
        parse_on_off("power", &value)?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(error = %e, "error closing line transport");
        }
    }
}
