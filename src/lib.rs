// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side codec and session driver for the IEEE C37.118 synchrophasor
//! protocol.
//!
//! This crate decodes and encodes the four C37.118 frame kinds (Data,
//! Header, Configuration, Command) and drives the handshake a client needs
//! to go from "socket open" to "streaming measurements" against a PMU or
//! PDC: send `TURN_OFF_TX`, request a configuration frame, negotiate past
//! any leftover data in flight, verify it, then start the stream.
//!
//! ```no_run
//! use std::time::Duration;
//! use c37118::session::Session;
//! use c37118::transport::tcp::TcpTransport;
//!
//! # fn main() -> c37118::error::Result<()> {
//! let transport = TcpTransport::connect("10.0.0.5:4712", Duration::from_secs(5))?;
//! let mut session = Session::connect(transport, 7)?;
//! session.start()?;
//! let frame = session.next_frame()?;
//! for station in &frame.stations {
//!     println!("{:?}", station.phasors);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bits;
pub mod config;
pub mod crc;
pub mod error;
pub mod frame;
pub mod session;
pub mod time;
pub mod transport;

pub use error::{Error, Result};
pub use frame::command::{Command, CommandFrame};
pub use frame::config_frame::{
    AnalogUnit, Config, DigitalUnit, Format, FundFreq, MeasurementType, PhasorUnit, Station,
};
pub use frame::data_frame::{DataFrame, Phasor, PmuData, Stat};
pub use frame::{FrameHeader, FrameType};
pub use session::{Session, SessionState};
pub use time::Timestamp;
pub use transport::{Transport, TransportKind};
