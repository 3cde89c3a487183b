// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction the session driver is built against.
//!
//! The codec and session driver depend on nothing more than this trait:
//! they never touch a `TcpStream` or `UdpSocket` directly, so the same
//! [`crate::session::Session`] logic drives a device over TCP, UDP, or a
//! Unix-domain socket used for testing.

pub mod tcp;
pub mod udp;

use std::io;
use std::time::Duration;

use crate::error::Result;

/// The I/O capability the codec depends on, spanning both stream- and
/// datagram-oriented transports.
///
/// A concrete transport supports exactly one of `read_exact` or
/// `read_datagram` meaningfully; the other returns
/// [`crate::error::Error::Io`] wrapping [`io::ErrorKind::Unsupported`].
/// [`crate::session::Session`] knows which to call from the transport's
/// [`TransportKind`].
pub trait Transport: Send {
    /// Which operation mode this transport supports.
    fn kind(&self) -> TransportKind;

    /// Read exactly `n` bytes, blocking up to the configured read timeout.
    ///
    /// Only meaningful on a [`TransportKind::Stream`] transport.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let _ = n;
        Err(unsupported("read_exact").into())
    }

    /// Read one complete datagram.
    ///
    /// Only meaningful on a [`TransportKind::Datagram`] transport. The
    /// codec relies on the transport delivering exactly one PMU frame per
    /// datagram — partial or coalesced datagrams are a transport bug, not
    /// something the codec can recover from.
    fn read_datagram(&mut self) -> Result<Vec<u8>> {
        Err(unsupported("read_datagram").into())
    }

    /// Write `bytes` in full.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Set the timeout applied to subsequent reads. `None` blocks
    /// indefinitely.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    /// Close the transport. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Which read primitive a [`Transport`] implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Byte-stream transport (TCP, or a stream-mode Unix socket):
    /// `read_exact` is meaningful, `read_datagram` is not.
    Stream,
    /// Datagram transport (UDP, or a datagram-mode Unix socket):
    /// `read_datagram` is meaningful, `read_exact` is not.
    Datagram,
}

fn unsupported(op: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, format!("{op} not supported by this transport"))
}
