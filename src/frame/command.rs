// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command frame encoder.
//!
//! Commands flow host → device only; this module never decodes one. The
//! frame carries a 2-byte command code after the common header, padded to a
//! fixed 18-byte total (14-byte header + 2-byte command word + 2-byte CRC).
//!
//! The timestamp fields (`SOC`/`FRACSEC`) are supplied explicitly by the
//! caller rather than sampled from the wall clock inside this module, so
//! the encoder stays pure and testable.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::COMMAND_FRAME_LEN;
use crate::frame::{append_frame_crc, encode_header, FrameHeader, FrameType};

/// Commands a host may issue to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Stop sending Data frames.
    TurnOffTransmission = 1,
    /// Start sending Data frames.
    TurnOnTransmission = 2,
    /// Request a Header frame.
    SendHeader = 3,
    /// Request a CFG-1 frame.
    SendConfig1 = 4,
    /// Request a CFG-2 frame.
    SendConfig2 = 5,
    /// Request an extended (vendor-defined) frame.
    SendExtended = 8,
}

impl Command {
    #[must_use]
    fn code(self) -> u16 {
        self as u16
    }
}

/// A Command frame, ready to encode onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    /// Target device identifier.
    pub idcode: u16,
    /// The command to issue.
    pub command: Command,
}

impl CommandFrame {
    /// Encode this command as an 18-byte frame, stamping `SOC`/`FRACSEC`
    /// from `now`.
    ///
    /// `now` is taken by the caller rather than read here, so command
    /// encoding has no hidden dependency on the system clock.
    #[must_use]
    pub fn encode(self, now: SystemTime) -> Vec<u8> {
        let elapsed = now.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        let soc = elapsed.as_secs() as u32;
        // FRACSEC carried in microseconds, matching a TIME_BASE of 1_000_000.
        let fracsec = elapsed.subsec_micros();

        let header = FrameHeader {
            frame_type: FrameType::Command,
            version: 1,
            framesize: COMMAND_FRAME_LEN as u16,
            idcode: self.idcode,
            soc,
            tq: 0,
            fracsec,
        };

        let mut buf = vec![0u8; COMMAND_FRAME_LEN];
        encode_header(&header, &mut buf);
        buf[14..16].copy_from_slice(&self.command.code().to_be_bytes());
        let total = append_frame_crc(&mut buf, 16);
        debug_assert_eq!(total, COMMAND_FRAME_LEN);
        buf
    }
}
