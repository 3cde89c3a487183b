// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream-oriented transports: TCP and, on Unix, `UnixStream`.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::Result;
use crate::transport::{Transport, TransportKind};

/// A `TcpStream`-backed [`Transport`].
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `addr`, applying `timeout` as the initial read timeout.
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout))?;
        Ok(Self { stream })
    }

    /// Wrap an already-connected stream.
    #[must_use]
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Transport for TcpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stream.shutdown(std::net::Shutdown::Both).or_else(|e| {
            // Already closed/not connected is not a failure from the
            // caller's point of view.
            if e.kind() == std::io::ErrorKind::NotConnected {
                Ok(())
            } else {
                Err(e)
            }
        })?;
        Ok(())
    }
}

#[cfg(unix)]
mod unix_stream {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::path::Path;
    use std::time::Duration;

    use crate::error::Result;
    use crate::transport::{Transport, TransportKind};

    /// A `UnixStream`-backed [`Transport`], used for local testing without a
    /// real socket pair.
    pub struct UnixStreamTransport {
        stream: UnixStream,
    }

    impl UnixStreamTransport {
        /// Connect to the Unix-domain socket at `path`.
        pub fn connect<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<Self> {
            let stream = UnixStream::connect(path)?;
            stream.set_read_timeout(Some(timeout))?;
            Ok(Self { stream })
        }

        /// Wrap an already-connected stream, e.g. from `UnixStream::pair()`.
        #[must_use]
        pub fn from_stream(stream: UnixStream) -> Self {
            Self { stream }
        }
    }

    impl Transport for UnixStreamTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Stream
        }

        fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
            let mut buf = vec![0u8; n];
            self.stream.read_exact(&mut buf)?;
            Ok(buf)
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            self.stream.write_all(bytes)?;
            Ok(())
        }

        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
            self.stream.set_read_timeout(timeout)?;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.stream.shutdown(std::net::Shutdown::Both).or_else(|e| {
                if e.kind() == std::io::ErrorKind::NotConnected {
                    Ok(())
                } else {
                    Err(e)
                }
            })?;
            Ok(())
        }
    }
}

#[cfg(unix)]
pub use unix_stream::UnixStreamTransport;
