// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time-base reconstruction.
//!
//! A C37.118 timestamp is carried as three separate wire fields — `SOC`
//! (whole UNIX seconds), `FRACSEC` (a fraction-of-second numerator), and
//! `TIME_BASE` (the denominator, supplied once per session by the active
//! `Config`) — which this module fuses into a single UTC instant.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// A UTC instant reconstructed from `SOC`/`FRACSEC`/`TIME_BASE`.
///
/// Invariant: `0 <= fracsec < time_base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    soc: u32,
    fracsec: u32,
    time_base: u32,
}

impl Timestamp {
    /// Construct a timestamp, validating the `FRACSEC < TIME_BASE` invariant.
    pub fn new(soc: u32, fracsec: u32, time_base: u32) -> Result<Self> {
        if time_base == 0 {
            return Err(Error::InvalidConfig { field: "time_base" });
        }
        if fracsec >= time_base {
            return Err(Error::InvalidConfig { field: "fracsec" });
        }
        Ok(Self { soc, fracsec, time_base })
    }

    /// Second-of-century (UNIX-epoch seconds) component.
    #[must_use]
    pub fn soc(&self) -> u32 {
        self.soc
    }

    /// Raw fraction-of-second numerator.
    #[must_use]
    pub fn fracsec(&self) -> u32 {
        self.fracsec
    }

    /// The `TIME_BASE` denominator this timestamp was decoded under.
    #[must_use]
    pub fn time_base(&self) -> u32 {
        self.time_base
    }

    /// Fractional part of the second, in `[0.0, 1.0)`.
    #[must_use]
    pub fn fraction_seconds(&self) -> f64 {
        f64::from(self.fracsec) / f64::from(self.time_base)
    }

    /// Full UTC instant as seconds since the UNIX epoch.
    #[must_use]
    pub fn utc_seconds(&self) -> f64 {
        f64::from(self.soc) + self.fraction_seconds()
    }

    /// Full UTC instant as a [`SystemTime`], rounded to nanosecond
    /// resolution.
    #[must_use]
    pub fn to_system_time(&self) -> SystemTime {
        let nanos = (self.fraction_seconds() * 1_000_000_000.0).round() as u64;
        UNIX_EPOCH + Duration::new(u64::from(self.soc), nanos as u32)
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.utc_seconds()
            .partial_cmp(&other.utc_seconds())
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}
