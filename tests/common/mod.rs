// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test doubles shared by the integration tests.
//!
//! - [`MockConnector`]: a scripted receiver with call recording and fault
//!   injection, for exercising retry and state logic without any wire format.
//! - [`FakeTcpReceiver`]: speaks the binary 5-byte dialect over an in-memory
//!   pipe.
//! - [`FakeLineReceiver`]: speaks the `Main.Attribute=Value` dialect over an
//!   in-memory pipe or a real socket.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nadav_lib::error::TransportError;
use nadav_lib::manager::{DEFAULT_MAX_VOLUME, DEFAULT_MIN_VOLUME, DEFAULT_VOLUME_STEP};
use nadav_lib::protocol::{
    Connector, PacketizedAdapter, QueryResponseAdapter, ReceiverProtocol, ReceiverStatus, Register,
};
use nadav_lib::types::{SourceMap, SourceSelector, StepDirection, Volume, VolumeRange};
use nadav_lib::Result;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

const PIPE_CAPACITY: usize = 1024;
const TEST_IO_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Scripted receiver
// ============================================================================

#[derive(Debug, Default)]
struct Script {
    status: ReceiverStatus,
    sources: Vec<String>,
    calls: Vec<String>,
    command_failures: usize,
    status_failures: usize,
    ping_failures: usize,
    refused_connects: usize,
}

/// Hands out [`ReceiverProtocol`]s backed by one shared script.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
    connects: Arc<AtomicUsize>,
}

impl MockConnector {
    /// A receiver that is on, unmuted, at 20% with no sources.
    pub fn new() -> Self {
        let connector = Self::default();
        connector.set_status(ReceiverStatus {
            power: true,
            muted: Some(false),
            volume: Some(Volume::new(20).unwrap()),
            source: None,
        });
        connector
    }

    pub fn with_sources(self, sources: &[&str]) -> Self {
        self.script.lock().unwrap().sources = sources.iter().map(ToString::to_string).collect();
        self
    }

    pub fn set_status(&self, status: ReceiverStatus) {
        self.script.lock().unwrap().status = status;
    }

    pub fn status(&self) -> ReceiverStatus {
        self.script.lock().unwrap().status.clone()
    }

    /// Makes the next `n` commands fail with a transport error.
    pub fn fail_commands(&self, n: usize) {
        self.script.lock().unwrap().command_failures = n;
    }

    /// Makes the next `n` status reads fail with a transport error.
    pub fn fail_status(&self, n: usize) {
        self.script.lock().unwrap().status_failures = n;
    }

    /// Makes the next `n` pings fail with a transport error.
    pub fn fail_pings(&self, n: usize) {
        self.script.lock().unwrap().ping_failures = n;
    }

    /// Makes the next `n` connects fail.
    pub fn refuse_connects(&self, n: usize) {
        self.script.lock().unwrap().refused_connects = n;
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Recorded protocol calls, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    /// Recorded calls that change the receiver.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call.as_str(), "status" | "sources" | "ping" | "close"))
            .collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn ReceiverProtocol>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.refused_connects > 0 {
            script.refused_connects -= 1;
            return Err(TransportError::Closed.into());
        }
        Ok(Box::new(MockProtocol {
            script: Arc::clone(&self.script),
        }))
    }
}

struct MockProtocol {
    script: Arc<Mutex<Script>>,
}

impl MockProtocol {
    /// Records `call`, then applies `effect` unless a failure is scripted.
    fn command(&self, call: String, effect: impl FnOnce(&mut ReceiverStatus)) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        if script.command_failures > 0 {
            script.command_failures -= 1;
            return Err(TransportError::Closed.into());
        }
        effect(&mut script.status);
        Ok(())
    }
}

#[async_trait]
impl ReceiverProtocol for MockProtocol {
    async fn source_list(&mut self) -> Result<Vec<String>> {
        let mut script = self.script.lock().unwrap();
        script.calls.push("sources".to_string());
        Ok(script.sources.clone())
    }

    async fn fetch_status(&mut self) -> Result<ReceiverStatus> {
        let mut script = self.script.lock().unwrap();
        script.calls.push("status".to_string());
        if script.status_failures > 0 {
            script.status_failures -= 1;
            return Err(TransportError::Closed.into());
        }
        Ok(script.status.clone())
    }

    async fn set_power(&mut self, on: bool) -> Result<()> {
        self.command(format!("power:{on}"), |status| status.power = on)
    }

    async fn set_volume(&mut self, volume: Volume) -> Result<()> {
        self.command(format!("volume:{}", volume.value()), |status| {
            status.volume = Some(volume);
        })
    }

    async fn step_volume(&mut self, direction: StepDirection, current: Volume) -> Result<()> {
        let call = format!("step:{direction:?}:{}", current.value());
        self.command(call, |status| {
            let delta = match direction {
                StepDirection::Up => 5,
                StepDirection::Down => -5,
            };
            status.volume = Some(Volume::clamped(i64::from(current.value()) + delta));
        })
    }

    async fn set_mute(&mut self, muted: bool) -> Result<()> {
        self.command(format!("mute:{muted}"), |status| status.muted = Some(muted))
    }

    async fn select_source(&mut self, source: &SourceSelector) -> Result<()> {
        match source {
            SourceSelector::Name(name) => self.command(format!("source:{name}"), |status| {
                status.source = Some(name.clone());
            }),
            SourceSelector::Code(code) => self.command(format!("source:#{code}"), |_| {}),
        }
    }

    async fn ping(&mut self) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.calls.push("ping".to_string());
        if script.ping_failures > 0 {
            script.ping_failures -= 1;
            return Err(TransportError::Closed.into());
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.script.lock().unwrap().calls.push("close".to_string());
    }
}

// ============================================================================
// Binary TCP dialect
// ============================================================================

/// A binary-dialect receiver with a register file.
///
/// Write frames update the register file silently; every poll frame is
/// answered with the register's current value.
#[derive(Debug, Clone)]
pub struct FakeTcpReceiver {
    registers: Arc<Mutex<[u8; 16]>>,
    writes: Arc<Mutex<Vec<[u8; 5]>>>,
}

impl FakeTcpReceiver {
    pub fn new(volume: u8, power: bool, mute: bool, source: u8) -> Self {
        let mut registers = [0u8; 16];
        registers[Register::Volume as usize] = volume;
        registers[Register::Power as usize] = u8::from(power);
        registers[Register::Mute as usize] = u8::from(mute);
        registers[Register::Source as usize] = source;
        Self {
            registers: Arc::new(Mutex::new(registers)),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn register(&self, register: Register) -> u8 {
        self.registers.lock().unwrap()[register as usize]
    }

    /// Write frames received so far.
    pub fn writes(&self) -> Vec<[u8; 5]> {
        self.writes.lock().unwrap().clone()
    }

    fn serve<S>(&self, mut stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let registers = Arc::clone(&self.registers);
        let writes = Arc::clone(&self.writes);
        tokio::spawn(async move {
            let mut frame = [0u8; 5];
            while stream.read_exact(&mut frame).await.is_ok() {
                if frame[3] == 0x02 {
                    let register = frame[4];
                    let value = registers.lock().unwrap()[usize::from(register & 0x0f)];
                    if stream.write_all(&[0x00, 0x01, 0x02, register, value]).await.is_err() {
                        break;
                    }
                } else {
                    registers.lock().unwrap()[usize::from(frame[3] & 0x0f)] = frame[4];
                    writes.lock().unwrap().push(frame);
                }
            }
        });
    }
}

#[async_trait]
impl Connector for FakeTcpReceiver {
    async fn connect(&self) -> Result<Box<dyn ReceiverProtocol>> {
        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        self.serve(server);
        let range = VolumeRange::half_decibels(DEFAULT_MIN_VOLUME, DEFAULT_MAX_VOLUME)?;
        Ok(Box::new(
            PacketizedAdapter::new(client, range, DEFAULT_VOLUME_STEP)
                .with_io_timeout(TEST_IO_TIMEOUT),
        ))
    }
}

// ============================================================================
// Line dialect
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineState {
    pub power: bool,
    pub muted: bool,
    pub volume_db: i32,
    pub source: u8,
}

/// A line-dialect receiver.
///
/// Every command is answered with the attribute's value afterwards; volume
/// steps move by 1 dB.
#[derive(Debug, Clone)]
pub struct FakeLineReceiver {
    state: Arc<Mutex<LineState>>,
    lines: Arc<Mutex<Vec<String>>>,
    sources: SourceMap,
}

impl FakeLineReceiver {
    pub fn new(state: LineState, sources: SourceMap) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            lines: Arc::new(Mutex::new(Vec::new())),
            sources,
        }
    }

    pub fn state(&self) -> LineState {
        self.state.lock().unwrap().clone()
    }

    /// Command lines received so far, without framing.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    /// Serves one connection until the peer closes it.
    pub fn serve<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let lines = Arc::clone(&self.lines);
        tokio::spawn(async move {
            let mut stream = BufReader::new(stream);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match stream.read_until(b'\r', &mut raw).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                lines.lock().unwrap().push(line.clone());

                let reply = answer(&mut state.lock().unwrap(), &line);
                let Some(reply) = reply else {
                    continue;
                };
                if stream.write_all(format!("{reply}\r").as_bytes()).await.is_err() {
                    break;
                }
            }
        });
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "On" } else { "Off" }
}

fn answer(state: &mut LineState, line: &str) -> Option<String> {
    let rest = line.strip_prefix("Main.")?;
    let (attribute, operation) = rest.split_at(rest.find(['?', '=', '+', '-'])?);

    match (attribute, operation) {
        ("Power", "=On") => state.power = true,
        ("Power", "=Off") => state.power = false,
        ("Mute", "=On") => state.muted = true,
        ("Mute", "=Off") => state.muted = false,
        ("Volume", "+") => state.volume_db += 1,
        ("Volume", "-") => state.volume_db -= 1,
        ("Volume", set) if set.starts_with('=') => state.volume_db = set[1..].parse().ok()?,
        ("Source", set) if set.starts_with('=') => state.source = set[1..].parse().ok()?,
        (_, "?") => {}
        _ => return None,
    }

    let value = match attribute {
        "Power" => on_off(state.power).to_string(),
        "Mute" => on_off(state.muted).to_string(),
        "Volume" => state.volume_db.to_string(),
        "Source" => state.source.to_string(),
        _ => return None,
    };
    Some(format!("Main.{attribute}={value}"))
}

#[async_trait]
impl Connector for FakeLineReceiver {
    async fn connect(&self) -> Result<Box<dyn ReceiverProtocol>> {
        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        self.serve(server);
        let range = VolumeRange::decibels(DEFAULT_MIN_VOLUME, DEFAULT_MAX_VOLUME)?;
        Ok(Box::new(
            QueryResponseAdapter::new(client, range, self.sources.clone())
                .with_io_timeout(TEST_IO_TIMEOUT),
        ))
    }
}

/// Two sources used across the line-dialect tests.
pub fn cd_and_tuner() -> SourceMap {
    [(1, "CD"), (2, "Tuner")].into_iter().collect()
}
