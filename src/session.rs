// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session driver — the state machine that turns a raw [`Transport`] plus
//! an `idcode` into a stream of decoded [`DataFrame`]s.
//!
//! # State Machine
//!
//! ```text
//!     Idle ──connect()──▶ Connected
//!     Connected ──send TURN_OFF_TX──▶ Silenced
//!     Silenced  ──send SEND_CFG2──▶ AwaitCfg
//!     AwaitCfg  ──read 1 byte──┬── 0xAA, type==CFG2 ─▶ ReadCfg
//!                              ├── 0xAA, other type  ─▶ drain & retry
//!                              └── not 0xAA           ─▶ drain & retry
//!     ReadCfg   ──read FRAMESIZE, verify CRC──▶ Ready
//!     Ready     ──start()──▶ Streaming            (send TURN_ON_TX)
//!     Streaming ──next_frame(): decode one Data frame──▶ Streaming
//!     Streaming ──stop()──▶ Ready                 (send TURN_OFF_TX)
//!     {any} ──transport closed / fatal──▶ Failed
//!     {any} ──disconnect()──▶ Idle
//! ```
//!
//! The drain-and-retry arc exists because a device that was mid-stream when
//! asked for its configuration may keep emitting Data frames for a moment;
//! the reframer must discard bytes until a valid SYNC byte followed by the
//! CFG-2 type code appears.

use std::time::SystemTime;

use log::{debug, error, warn};

use crate::config::{MAX_DRAIN_BYTES, MAX_DRAIN_DATAGRAMS, NEGOTIATION_MAX_RETRIES};
use crate::error::{Error, FrameCorruptReason, Result};
use crate::frame::command::{Command, CommandFrame};
use crate::frame::config_frame::{Config, Station};
use crate::frame::data_frame::DataFrame;
use crate::frame::{decode_header, peek_frame_type, FrameHeader, FrameType};
use crate::transport::{Transport, TransportKind};

/// The session driver's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not connected; no transport held.
    Idle,
    /// Transport open, negotiation not yet started.
    Connected,
    /// `TURN_OFF_TX` sent; waiting for the device to quiesce.
    Silenced,
    /// `SEND_CFG2` sent; scanning the transport for a CFG-2 response.
    AwaitCfg,
    /// A CFG-2 SYNC/type match was found; reading and verifying the body.
    ReadCfg,
    /// Configuration negotiated; not yet streaming.
    Ready,
    /// `TURN_ON_TX` sent; `next_frame` yields Data frames.
    Streaming,
    /// Unrecoverable transport failure. Requires `disconnect` + `connect`.
    Failed,
}

/// A live session with a PMU/PDC device.
pub struct Session<T: Transport> {
    transport: T,
    state: SessionState,
    idcode: u16,
    config: Option<Config>,
    time_reliable: bool,
}

impl<T: Transport> Session<T> {
    /// Run negotiation (`Connected` → `Ready`) against an already-open
    /// transport, then return the session ready for [`Session::start`].
    pub fn connect(mut transport: T, idcode: u16) -> Result<Self> {
        let silence = CommandFrame {
            idcode,
            command: Command::TurnOffTransmission,
        }
        .encode(SystemTime::now());
        transport.write_all(&silence)?;

        let mut last_err = Error::NegotiationFailed;
        for attempt in 0..NEGOTIATION_MAX_RETRIES {
            debug!("c37118: idcode={idcode} negotiation attempt {attempt}: requesting CFG-2");
            let request = CommandFrame {
                idcode,
                command: Command::SendConfig2,
            }
            .encode(SystemTime::now());
            transport.write_all(&request)?;

            match Self::await_cfg2(&mut transport) {
                Ok(frame_bytes) => {
                    let config = Config::decode(&frame_bytes)?;
                    let time_reliable = !config.header.is_time_unreliable();
                    debug!(
                        "c37118: idcode={idcode} negotiated CFG-2 with {} station(s)",
                        config.stations.len()
                    );
                    return Ok(Self {
                        transport,
                        state: SessionState::Ready,
                        idcode,
                        config: Some(config),
                        time_reliable,
                    });
                }
                Err(Error::FrameCorrupt(_)) | Err(Error::UnexpectedFrameType { .. }) => {
                    // Drain exhausted its budget without a match; resend and
                    // retry, still within `AwaitCfg`.
                    warn!("c37118: idcode={idcode} attempt {attempt} found no CFG-2 within the drain budget, retrying");
                    last_err = Error::NegotiationFailed;
                    continue;
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }

        error!("c37118: idcode={idcode} exhausted {NEGOTIATION_MAX_RETRIES} negotiation retries");
        Err(last_err)
    }

    /// Scan the transport for a CFG-2 frame, discarding any other bytes or
    /// datagrams encountered along the way, up to a bounded budget.
    fn await_cfg2(transport: &mut T) -> Result<Vec<u8>> {
        match transport.kind() {
            TransportKind::Stream => Self::await_cfg2_stream(transport),
            TransportKind::Datagram => Self::await_cfg2_datagram(transport),
        }
    }

    fn await_cfg2_stream(transport: &mut T) -> Result<Vec<u8>> {
        let mut drained = 0usize;
        loop {
            let b0 = transport.read_exact(1)?[0];
            if b0 != crate::config::SYNC_BYTE {
                drained += 1;
                if drained > MAX_DRAIN_BYTES {
                    return Err(Error::FrameCorrupt(FrameCorruptReason::BadSync));
                }
                continue;
            }
            let b1 = transport.read_exact(1)?[0];
            if peek_frame_type(b0, b1) != Some(FrameType::Cfg2) {
                drained += 2;
                if drained > MAX_DRAIN_BYTES {
                    return Err(Error::FrameCorrupt(FrameCorruptReason::BadSync));
                }
                continue;
            }

            let rest_of_header = transport.read_exact(12)?;
            let mut header_bytes = Vec::with_capacity(14);
            header_bytes.push(b0);
            header_bytes.push(b1);
            header_bytes.extend_from_slice(&rest_of_header);

            let header = decode_header(&header_bytes)?;
            if header.framesize < 16 {
                return Err(Error::FrameCorrupt(FrameCorruptReason::BadLength));
            }
            let remaining = transport.read_exact(header.framesize as usize - 14)?;
            header_bytes.extend_from_slice(&remaining);
            return Ok(header_bytes);
        }
    }

    fn await_cfg2_datagram(transport: &mut T) -> Result<Vec<u8>> {
        for _ in 0..MAX_DRAIN_DATAGRAMS {
            let datagram = transport.read_datagram()?;
            let header = match decode_header(&datagram) {
                Ok(h) => h,
                Err(_) => continue,
            };
            if header.frame_type == FrameType::Cfg2 {
                return Ok(datagram);
            }
        }
        Err(Error::FrameCorrupt(FrameCorruptReason::BadSync))
    }

    /// `true` unless the most recently observed frame's time-quality byte
    /// signaled an unreliable clock.
    #[must_use]
    pub fn is_time_reliable(&self) -> bool {
        self.time_reliable
    }

    /// The negotiated stations, in CFG-2 order.
    #[must_use]
    pub fn stations(&self) -> &[Station] {
        self.config
            .as_ref()
            .map(|c| c.stations.as_slice())
            .unwrap_or(&[])
    }

    /// The negotiated configuration, if `connect` has completed.
    #[must_use]
    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    /// The device's nominal frame rate, positive = frames/second, negative
    /// `n` = one frame every `|n|` seconds. `None` before negotiation
    /// completes.
    #[must_use]
    pub fn data_rate(&self) -> Option<i16> {
        self.config.as_ref().map(|c| c.data_rate)
    }

    /// Current state machine state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Begin streaming: sends `TURN_ON_TX` and transitions `Ready` →
    /// `Streaming`.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(Error::InvalidConfig { field: "state" });
        }
        let cmd = CommandFrame {
            idcode: self.idcode,
            command: Command::TurnOnTransmission,
        }
        .encode(SystemTime::now());
        self.transport.write_all(&cmd)?;
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Stop streaming: sends `TURN_OFF_TX` and transitions `Streaming` →
    /// `Ready`.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != SessionState::Streaming {
            return Err(Error::InvalidConfig { field: "state" });
        }
        let cmd = CommandFrame {
            idcode: self.idcode,
            command: Command::TurnOffTransmission,
        }
        .encode(SystemTime::now());
        self.transport.write_all(&cmd)?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Decode the next Data frame.
    ///
    /// A [`Error::Timeout`] leaves the session in `Streaming` unchanged; the
    /// caller may call `next_frame` again. A [`Error::TransportClosed`] (or
    /// any other I/O failure) transitions the session to `Failed`.
    pub fn next_frame(&mut self) -> Result<DataFrame> {
        if self.state != SessionState::Streaming {
            return Err(Error::InvalidConfig { field: "state" });
        }
        let config = self
            .config
            .as_ref()
            .ok_or(Error::InvalidConfig { field: "config" })?;

        let result = match self.transport.kind() {
            TransportKind::Stream => Self::read_data_frame_stream(&mut self.transport, config),
            TransportKind::Datagram => {
                Self::read_data_frame_datagram(&mut self.transport, config)
            }
        };

        match &result {
            Err(Error::TransportClosed) | Err(Error::Io(_)) => {
                error!("c37118: idcode={} transport failed, session is now Failed", self.idcode);
                self.state = SessionState::Failed;
            }
            Err(Error::SchemaMismatch) => {
                warn!(
                    "c37118: idcode={} data frame length disagreed with the active configuration",
                    self.idcode
                );
            }
            Ok(frame) => {
                debug!(
                    "c37118: idcode={} decoded Data frame, {} station(s)",
                    self.idcode,
                    frame.stations.len()
                );
                self.time_reliable = !frame.header.is_time_unreliable();
            }
            _ => {}
        }
        result
    }

    fn read_data_frame_stream(transport: &mut T, config: &Config) -> Result<DataFrame> {
        let prefix = transport.read_exact(4)?;
        let framesize = u16::from_be_bytes([prefix[2], prefix[3]]);
        if (framesize as usize) < 4 {
            return Err(Error::FrameCorrupt(FrameCorruptReason::BadLength));
        }
        let rest = transport.read_exact(framesize as usize - 4)?;
        let mut buf = prefix;
        buf.extend_from_slice(&rest);
        DataFrame::decode(&buf, config)
    }

    fn read_data_frame_datagram(transport: &mut T, config: &Config) -> Result<DataFrame> {
        let datagram = transport.read_datagram()?;
        DataFrame::decode(&datagram, config)
    }

    /// Close the transport and return to `Idle`. Any bytes buffered
    /// mid-frame are discarded along with the transport.
    pub fn disconnect(&mut self) -> Result<()> {
        self.transport.close()?;
        self.state = SessionState::Idle;
        self.config = None;
        Ok(())
    }

    /// The header of the most recently negotiated configuration, if any.
    #[must_use]
    pub fn header(&self) -> Option<&FrameHeader> {
        self.config.as_ref().map(|c| &c.header)
    }
}
