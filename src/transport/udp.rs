// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Datagram-oriented transports: UDP and, on Unix, `UnixDatagram`.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Socket, Type};

use crate::error::Result;
use crate::transport::{Transport, TransportKind};

const MAX_DATAGRAM_SIZE: usize = 65_507;

/// A `UdpSocket`-backed [`Transport`].
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a local socket (with `SO_REUSEADDR`, so a session can reconnect
    /// to the same device without waiting out the previous socket's
    /// `TIME_WAIT`) and connect it to `addr` so that subsequent
    /// `send`/`recv` implicitly target the peer.
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self> {
        let peer = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no address"))?;
        let domain = if peer.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let raw = Socket::new(domain, Type::DGRAM, None)?;
        raw.set_reuse_address(true)?;
        let bind_addr: SocketAddr = if peer.is_ipv6() {
            "[::]:0".parse().unwrap()
        } else {
            "0.0.0.0:0".parse().unwrap()
        };
        raw.bind(&bind_addr.into())?;
        let socket: UdpSocket = raw.into();
        socket.connect(peer)?;
        socket.set_read_timeout(Some(timeout))?;
        Ok(Self { socket })
    }

    /// Wrap an already-connected socket.
    #[must_use]
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

impl Transport for UdpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Datagram
    }

    fn read_datagram(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let n = self.socket.recv(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.socket.send(bytes)?;
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // UdpSocket has no explicit close; dropping releases the fd. Nothing
        // to do here beyond satisfying the trait.
        Ok(())
    }
}

#[cfg(unix)]
mod unix_datagram {
    use std::os::unix::net::UnixDatagram;
    use std::path::Path;
    use std::time::Duration;

    use crate::error::Result;
    use crate::transport::{Transport, TransportKind};

    use super::MAX_DATAGRAM_SIZE;

    /// A `UnixDatagram`-backed [`Transport`].
    pub struct UnixDatagramTransport {
        socket: UnixDatagram,
    }

    impl UnixDatagramTransport {
        /// Bind an unnamed local socket and connect it to the datagram
        /// socket at `path`.
        pub fn connect<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<Self> {
            let socket = UnixDatagram::unbound()?;
            socket.connect(path)?;
            socket.set_read_timeout(Some(timeout))?;
            Ok(Self { socket })
        }

        /// Wrap an already-connected socket, e.g. from
        /// `UnixDatagram::pair()`.
        #[must_use]
        pub fn from_socket(socket: UnixDatagram) -> Self {
            Self { socket }
        }
    }

    impl Transport for UnixDatagramTransport {
        fn kind(&self) -> TransportKind {
            TransportKind::Datagram
        }

        fn read_datagram(&mut self) -> Result<Vec<u8>> {
            let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
            let n = self.socket.recv(&mut buf)?;
            buf.truncate(n);
            Ok(buf)
        }

        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            self.socket.send(bytes)?;
            Ok(())
        }

        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
            self.socket.set_read_timeout(timeout)?;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }
}

#[cfg(unix)]
pub use unix_datagram::UnixDatagramTransport;
