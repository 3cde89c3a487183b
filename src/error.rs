// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! Errors are split along the line drawn in the session driver's state
//! machine: transport failures are (almost) always fatal to the session,
//! while frame-level errors are either absorbed with retry during
//! negotiation or surfaced verbatim during steady-state streaming. See
//! [`crate::session`] for which path each variant takes.

use std::fmt;

/// Reason a frame failed structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCorruptReason {
    /// First byte was not `0xAA`, or the frame-type nibble is unknown.
    BadSync,
    /// `FRAMESIZE` did not match the number of bytes actually available.
    BadLength,
    /// Trailing CRC-CCITT did not match the computed checksum.
    BadCrc,
}

impl fmt::Display for FrameCorruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadSync => write!(f, "bad sync byte or frame type"),
            Self::BadLength => write!(f, "FRAMESIZE does not match available bytes"),
            Self::BadCrc => write!(f, "CRC-CCITT mismatch"),
        }
    }
}

/// Errors produced by the codec, session driver, and transport adapters.
#[derive(Debug)]
pub enum Error {
    /// The peer closed the connection; the owning session is now `Failed`.
    TransportClosed,
    /// The configured read timeout elapsed before a full read completed.
    ///
    /// Recoverable: the caller may retry the same operation.
    Timeout,
    /// A frame failed structural validation.
    FrameCorrupt(FrameCorruptReason),
    /// An unexpected frame type arrived during negotiation.
    UnexpectedFrameType {
        /// Frame type the driver was waiting for.
        expected: &'static str,
        /// Frame type actually observed.
        got: u8,
    },
    /// A Data frame's byte length under the active `Config` does not match
    /// `FRAMESIZE` — usually a device configuration change the driver
    /// missed.
    SchemaMismatch,
    /// A configuration value is structurally impossible.
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Negotiation exhausted its retry budget without reaching `Ready`.
    NegotiationFailed,
    /// Underlying I/O failure not covered by the above.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportClosed => write!(f, "transport closed by peer"),
            Self::Timeout => write!(f, "read timed out"),
            Self::FrameCorrupt(reason) => write!(f, "frame corrupt: {reason}"),
            Self::UnexpectedFrameType { expected, got } => {
                write!(f, "expected {expected} frame, got frame type {got}")
            }
            Self::SchemaMismatch => {
                write!(f, "data frame length does not match active configuration")
            }
            Self::InvalidConfig { field } => write!(f, "invalid configuration field: {field}"),
            Self::NegotiationFailed => write!(f, "negotiation retry budget exhausted"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Self::Timeout,
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => Self::TransportClosed,
            _ => Self::Io(e),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
