// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Data frame decoder.
//!
//! Decoding a Data frame requires the `Config` negotiated earlier in the
//! session: FRAMESIZE alone does not disambiguate station count, channel
//! counts, or numeric formats.

use crate::bits::{read_f32_be, read_i16_be, read_u16_be};
use crate::error::{Error, FrameCorruptReason, Result};
use crate::frame::config_frame::{Config, Format, Station};
use crate::frame::{decode_header, verify_frame_crc, FrameHeader, FrameType};
use crate::time::Timestamp;

/// Data-quality and synchronization sub-fields of the 16-bit STAT word.
///
/// See IEEE C37.118 Table 8; bit numbering is LSB-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Raw STAT word, preserved for callers that need bits this struct does
    /// not break out individually.
    pub raw: u16,
    /// Bits 15-14: `0`=good, `1`=PMU error/stale, `2`=data sorted but not
    /// corrected, `3`=invalid (PMU in test mode or error).
    pub data_error: u8,
    /// Bit 13 clear: this station is synchronized to its time source.
    pub pmu_synced: bool,
    /// Bit 12 set: data sorted by arrival rather than by timestamp.
    pub sorted_by_arrival: bool,
    /// Bit 11: PMU trigger is currently asserted.
    pub triggered: bool,
    /// Bit 10: configuration changed since the last CFG frame was sent.
    pub config_changed: bool,
    /// Bit 9: data has been modified by a post-processing algorithm.
    pub data_modified: bool,
    /// Bits 8-6: time-quality code (UTC offset accuracy class).
    pub time_quality: u8,
    /// Bits 5-4: "time since last sync loss" code.
    pub unlocked_time: u8,
    /// Bits 3-0: device-specific trigger reason.
    pub trigger_reason: u8,
}

impl Stat {
    fn from_word(raw: u16) -> Self {
        Self {
            raw,
            data_error: ((raw >> 14) & 0b11) as u8,
            pmu_synced: (raw >> 13) & 1 == 0,
            sorted_by_arrival: (raw >> 12) & 1 != 0,
            triggered: (raw >> 11) & 1 != 0,
            config_changed: (raw >> 10) & 1 != 0,
            data_modified: (raw >> 9) & 1 != 0,
            time_quality: ((raw >> 6) & 0b111) as u8,
            unlocked_time: ((raw >> 4) & 0b11) as u8,
            trigger_reason: (raw & 0b1111) as u8,
        }
    }
}

/// A single phasor measurement, always populated in both representations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phasor {
    /// Real component (rectangular) or the cosine projection of (mag, rad)
    /// when the wire format was polar.
    pub real: f64,
    /// Imaginary component, analogous to `real`.
    pub imag: f64,
    /// Magnitude, always non-negative.
    pub mag: f64,
    /// Angle in radians, range `(-pi, pi]`.
    pub rad: f64,
}

impl Phasor {
    fn from_rectangular(real: f64, imag: f64) -> Self {
        Self {
            real,
            imag,
            mag: real.hypot(imag),
            rad: imag.atan2(real),
        }
    }

    fn from_polar(mag: f64, rad: f64) -> Self {
        Self {
            real: mag * rad.cos(),
            imag: mag * rad.sin(),
            mag,
            rad,
        }
    }
}

/// One station's worth of decoded measurements within a Data frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PmuData {
    /// Index into the owning `Config`'s `stations` slice.
    pub station_index: usize,
    /// Decoded STAT word.
    pub stat: Stat,
    /// Phasor measurements, in the station's configured order.
    pub phasors: Vec<Phasor>,
    /// Frequency deviation from nominal (Hz) if int16-encoded, or absolute
    /// frequency (Hz) if float32-encoded — see the owning station's
    /// `Format::freq_is_float`.
    pub freq: f64,
    /// Rate of change of frequency, in Hz/s.
    pub dfreq: f64,
    /// Analog channel values, in the station's configured order.
    pub analogs: Vec<f64>,
    /// Named digital bits, in the station's configured order.
    pub digitals: Vec<(String, u8)>,
}

/// A decoded Data frame: one or more `PmuData` records, one per station in
/// the active `Config`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    /// The common frame header this frame arrived under.
    pub header: FrameHeader,
    /// Per-station measurements, in `Config` order.
    pub stations: Vec<PmuData>,
}

impl DataFrame {
    /// Decode a complete Data frame against a previously negotiated
    /// `Config`, verifying its trailing CRC.
    pub fn decode(buf: &[u8], config: &Config) -> Result<Self> {
        let header = decode_header(buf)?;
        if header.frame_type != FrameType::Data {
            return Err(Error::UnexpectedFrameType {
                expected: "Data",
                got: header.frame_type.to_bits(),
            });
        }
        verify_frame_crc(buf, header.framesize)?;

        let mut off = 14;
        let mut stations = Vec::with_capacity(config.stations.len());
        for (index, station) in config.stations.iter().enumerate() {
            let (pmu_data, next) = decode_station_data(buf, off, index, station)?;
            stations.push(pmu_data);
            off = next;
        }

        let expected_len = off + 2;
        if expected_len != header.framesize as usize {
            return Err(Error::SchemaMismatch);
        }

        Ok(Self { header, stations })
    }

    /// Fuse this frame's `SOC`/`FRACSEC` against `config.time_base` into a
    /// single UTC instant.
    ///
    /// Fails only if the frame's own header violates the
    /// `FRACSEC < TIME_BASE` invariant, which `FrameHeader` decoding itself
    /// does not check (the invariant depends on the `Config` the frame was
    /// decoded against, not on the header alone).
    pub fn timestamp(&self, config: &Config) -> Result<Timestamp> {
        Timestamp::new(self.header.soc, self.header.fracsec, config.time_base)
    }
}

fn decode_station_data(
    buf: &[u8],
    start: usize,
    index: usize,
    station: &Station,
) -> Result<(PmuData, usize)> {
    let mut off = start;
    let format = station.format;

    if off + 2 > buf.len() {
        return Err(Error::FrameCorrupt(FrameCorruptReason::BadLength));
    }
    let stat = Stat::from_word(read_u16_be(buf, off));
    off += 2;

    let mut phasors = Vec::with_capacity(station.phnmr as usize);
    for _ in 0..station.phnmr {
        let (phasor, next) = decode_phasor(buf, off, format)?;
        phasors.push(phasor);
        off = next;
    }

    let (freq, next) = decode_numeric(buf, off, format.freq_width())?;
    off = next;
    let freq = if format.freq_is_float {
        freq
    } else {
        freq / 1000.0
    };

    let (dfreq_raw, next) = decode_numeric(buf, off, format.freq_width())?;
    off = next;
    let dfreq = if format.freq_is_float {
        dfreq_raw
    } else {
        dfreq_raw / 100.0
    };

    let mut analogs = Vec::with_capacity(station.annmr as usize);
    for _ in 0..station.annmr {
        let (value, next) = decode_numeric(buf, off, format.analog_width())?;
        analogs.push(value);
        off = next;
    }

    let digital_names = &station.digital_names;
    let mut digitals = Vec::with_capacity(digital_names.len());
    for word_index in 0..station.dgnmr as usize {
        if off + 2 > buf.len() {
            return Err(Error::FrameCorrupt(FrameCorruptReason::BadLength));
        }
        let word = read_u16_be(buf, off);
        off += 2;
        for bit in 0..16 {
            let name_index = word_index * 16 + bit;
            let name = digital_names
                .get(name_index)
                .cloned()
                .unwrap_or_else(|| format!("DIGITAL_{name_index}"));
            let value = ((word >> bit) & 1) as u8;
            digitals.push((name, value));
        }
    }

    Ok((
        PmuData {
            station_index: index,
            stat,
            phasors,
            freq,
            dfreq,
            analogs,
            digitals,
        },
        off,
    ))
}

fn decode_phasor(buf: &[u8], off: usize, format: Format) -> Result<(Phasor, usize)> {
    let width = format.phasor_width();
    if off + width > buf.len() {
        return Err(Error::FrameCorrupt(FrameCorruptReason::BadLength));
    }
    let (a, b) = if format.phasor_is_float {
        (
            f64::from(read_f32_be(buf, off)),
            f64::from(read_f32_be(buf, off + 4)),
        )
    } else {
        (
            f64::from(read_i16_be(buf, off)),
            f64::from(read_i16_be(buf, off + 2)),
        )
    };

    let phasor = if format.phasor_is_polar {
        let rad = if format.phasor_is_float {
            b
        } else {
            b / 10_000.0
        };
        Phasor::from_polar(a, rad)
    } else {
        Phasor::from_rectangular(a, b)
    };

    Ok((phasor, off + width))
}

fn decode_numeric(buf: &[u8], off: usize, width: usize) -> Result<(f64, usize)> {
    if off + width > buf.len() {
        return Err(Error::FrameCorrupt(FrameCorruptReason::BadLength));
    }
    let value = if width == 4 {
        f64::from(read_f32_be(buf, off))
    } else {
        f64::from(read_i16_be(buf, off))
    };
    Ok((value, off + width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc_ccitt;
    use crate::frame::config_frame::{AnalogUnit, DigitalUnit, Format, FundFreq, MeasurementType, PhasorUnit};

    fn station(format: Format, phnmr: u16, annmr: u16, dgnmr: u16) -> Station {
        Station {
            name: "S1".into(),
            idcode: 1,
            format,
            phnmr,
            annmr,
            dgnmr,
            phasor_names: (0..phnmr).map(|i| format!("PH{i}")).collect(),
            analog_names: (0..annmr).map(|i| format!("AN{i}")).collect(),
            digital_names: (0..dgnmr as usize * 16).map(|i| format!("D{i}")).collect(),
            phunit: vec![PhasorUnit { kind: MeasurementType::Voltage, scale: 1 }; phnmr as usize],
            anunit: vec![AnalogUnit { unit_type: 0, scale: 1 }; annmr as usize],
            digunit: vec![DigitalUnit { normal_status: 0, valid_inputs: 0xFFFF }; dgnmr as usize],
            nominal_freq: FundFreq::Hz60,
            cfgcnt: 1,
        }
    }

    fn config_with(station: Station) -> Config {
        Config {
            header: decode_header(&{
                let mut h = [0u8; 14];
                h[0] = 0xAA;
                h[1] = 0x33;
                h
            })
            .unwrap(),
            time_base: 1_000_000,
            stations: vec![station],
            data_rate: 30,
        }
    }

    fn frame_bytes(body: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0xAA, 0x01]); // Data frame, v1
        buf.extend_from_slice(&[0, 0]); // framesize placeholder
        buf.extend_from_slice(&7u16.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.push(0);
        buf.extend_from_slice(&[0, 0, 0]);
        buf.extend_from_slice(body);
        let framesize = (buf.len() + 2) as u16;
        buf[2..4].copy_from_slice(&framesize.to_be_bytes());
        let crc = crc_ccitt(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());
        buf
    }

    #[test]
    fn decodes_int16_polar_phasor() {
        let format = Format {
            freq_is_float: false,
            analog_is_float: false,
            phasor_is_float: false,
            phasor_is_polar: true,
        };
        let config = config_with(station(format, 1, 0, 0));

        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_be_bytes()); // STAT
        body.extend_from_slice(&100i16.to_be_bytes()); // mag
        body.extend_from_slice(&0i16.to_be_bytes()); // angle = 0 rad
        body.extend_from_slice(&0i16.to_be_bytes()); // freq deviation = 0 mHz
        body.extend_from_slice(&0i16.to_be_bytes()); // dfreq = 0

        let buf = frame_bytes(&body);
        let decoded = DataFrame::decode(&buf, &config).unwrap();
        let phasor = decoded.stations[0].phasors[0];
        assert!((phasor.mag - 100.0).abs() < 1e-9);
        assert!((phasor.rad).abs() < 1e-9);
        assert!((phasor.real - 100.0).abs() < 1e-6);
        assert!((phasor.imag).abs() < 1e-6);
    }

    #[test]
    fn decodes_float32_rectangular_phasor() {
        let format = Format {
            freq_is_float: true,
            analog_is_float: false,
            phasor_is_float: true,
            phasor_is_polar: false,
        };
        let config = config_with(station(format, 1, 0, 0));

        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&3.0f32.to_be_bytes());
        body.extend_from_slice(&4.0f32.to_be_bytes());
        body.extend_from_slice(&60.01f32.to_be_bytes()); // freq (float, absolute)
        body.extend_from_slice(&0.5f32.to_be_bytes()); // dfreq (float, Hz/s)

        let buf = frame_bytes(&body);
        let decoded = DataFrame::decode(&buf, &config).unwrap();
        let data = &decoded.stations[0];
        let phasor = data.phasors[0];
        assert!((phasor.real - 3.0).abs() < 1e-6);
        assert!((phasor.imag - 4.0).abs() < 1e-6);
        assert!((phasor.mag - 5.0).abs() < 1e-6);
        assert!((data.freq - 60.01).abs() < 1e-4);
        assert!((data.dfreq - 0.5).abs() < 1e-6);
    }

    #[test]
    fn decodes_int16_rocof() {
        let format = Format {
            freq_is_float: false,
            analog_is_float: false,
            phasor_is_float: false,
            phasor_is_polar: false,
        };
        let config = config_with(station(format, 0, 0, 0));

        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0i16.to_be_bytes()); // freq deviation
        body.extend_from_slice(&250i16.to_be_bytes()); // dfreq raw -> /100 Hz/s

        let buf = frame_bytes(&body);
        let decoded = DataFrame::decode(&buf, &config).unwrap();
        assert!((decoded.stations[0].dfreq - 2.5).abs() < 1e-9);
    }

    /// Every one of the 16 `Format` combinations (frequency/analog/phasor
    /// numeric selector x phasor rect-vs-polar) must decode a one-phasor,
    /// one-analog station to the field widths and values its bits imply.
    #[test]
    fn decodes_every_format_combination() {
        for bits in 0u16..16 {
            let format = Format {
                freq_is_float: bits & 0x01 != 0,
                analog_is_float: bits & 0x02 != 0,
                phasor_is_float: bits & 0x04 != 0,
                phasor_is_polar: bits & 0x08 != 0,
            };
            let config = config_with(station(format, 1, 1, 0));

            let mut body = Vec::new();
            body.extend_from_slice(&0u16.to_be_bytes()); // STAT

            if format.phasor_is_polar {
                if format.phasor_is_float {
                    body.extend_from_slice(&10.0f32.to_be_bytes()); // mag
                    body.extend_from_slice(&0.5f32.to_be_bytes()); // rad
                } else {
                    body.extend_from_slice(&100i16.to_be_bytes()); // mag
                    body.extend_from_slice(&5000i16.to_be_bytes()); // angle*10000 -> 0.5 rad
                }
            } else if format.phasor_is_float {
                body.extend_from_slice(&3.0f32.to_be_bytes()); // real
                body.extend_from_slice(&4.0f32.to_be_bytes()); // imag
            } else {
                body.extend_from_slice(&3i16.to_be_bytes());
                body.extend_from_slice(&4i16.to_be_bytes());
            }

            if format.freq_is_float {
                body.extend_from_slice(&60.25f32.to_be_bytes()); // absolute Hz
                body.extend_from_slice(&0.5f32.to_be_bytes()); // dfreq Hz/s
            } else {
                body.extend_from_slice(&250i16.to_be_bytes()); // mHz deviation -> 0.25 Hz
                body.extend_from_slice(&250i16.to_be_bytes()); // raw/100 -> 2.5 Hz/s
            }

            if format.analog_is_float {
                body.extend_from_slice(&12.5f32.to_be_bytes());
            } else {
                body.extend_from_slice(&500i16.to_be_bytes());
            }

            let buf = frame_bytes(&body);
            let decoded = DataFrame::decode(&buf, &config)
                .unwrap_or_else(|e| panic!("format {bits:#06b} failed to decode: {e:?}"));
            let pmu = &decoded.stations[0];

            let phasor = pmu.phasors[0];
            if format.phasor_is_polar {
                let expected_mag = if format.phasor_is_float { 10.0 } else { 100.0 };
                assert!((phasor.mag - expected_mag).abs() < 1e-6, "format {bits:#06b}");
                assert!((phasor.rad - 0.5).abs() < 1e-6, "format {bits:#06b}");
                assert!((phasor.real - expected_mag * 0.5f64.cos()).abs() < 1e-6, "format {bits:#06b}");
            } else {
                assert!((phasor.real - 3.0).abs() < 1e-6, "format {bits:#06b}");
                assert!((phasor.imag - 4.0).abs() < 1e-6, "format {bits:#06b}");
                assert!((phasor.mag - 5.0).abs() < 1e-6, "format {bits:#06b}");
            }

            if format.freq_is_float {
                assert!((pmu.freq - 60.25).abs() < 1e-4, "format {bits:#06b}");
                assert!((pmu.dfreq - 0.5).abs() < 1e-6, "format {bits:#06b}");
            } else {
                assert!((pmu.freq - 0.25).abs() < 1e-9, "format {bits:#06b}");
                assert!((pmu.dfreq - 2.5).abs() < 1e-9, "format {bits:#06b}");
            }

            let expected_analog = if format.analog_is_float { 12.5 } else { 500.0 };
            assert!((pmu.analogs[0] - expected_analog).abs() < 1e-4, "format {bits:#06b}");
        }
    }

    #[test]
    fn stat_word_reports_unreliable_time_quality() {
        let word = Stat::from_word(0x2000); // bit 13 set -> unsynced
        assert!(!word.pmu_synced);
    }

    #[test]
    fn digitals_are_named_from_station_table() {
        let format = Format {
            freq_is_float: false,
            analog_is_float: false,
            phasor_is_float: false,
            phasor_is_polar: false,
        };
        let config = config_with(station(format, 0, 0, 1));

        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0i16.to_be_bytes());
        body.extend_from_slice(&0i16.to_be_bytes());
        body.extend_from_slice(&0b1010_0000_0000_0001u16.to_be_bytes());

        let buf = frame_bytes(&body);
        let decoded = DataFrame::decode(&buf, &config).unwrap();
        let digitals = &decoded.stations[0].digitals;
        assert_eq!(digitals.len(), 16);
        assert_eq!(digitals[0], ("D0".to_string(), 1));
        assert_eq!(digitals[13], ("D13".to_string(), 1));
        assert_eq!(digitals[15], ("D15".to_string(), 1));
    }

    #[test]
    fn timestamp_fuses_soc_fracsec_and_config_time_base() {
        let format = Format {
            freq_is_float: false,
            analog_is_float: false,
            phasor_is_float: false,
            phasor_is_polar: false,
        };
        let config = config_with(station(format, 0, 0, 0));

        let mut buf = Vec::new();
        buf.extend_from_slice(&[0xAA, 0x01]);
        buf.extend_from_slice(&[0, 0]);
        buf.extend_from_slice(&7u16.to_be_bytes());
        buf.extend_from_slice(&1_700_000_000u32.to_be_bytes());
        buf.push(0);
        buf.extend_from_slice(&[0x07, 0xA1, 0x20]); // fracsec = 500_000
        buf.extend_from_slice(&0u16.to_be_bytes()); // STAT
        buf.extend_from_slice(&0i16.to_be_bytes());
        buf.extend_from_slice(&0i16.to_be_bytes());
        let framesize = (buf.len() + 2) as u16;
        buf[2..4].copy_from_slice(&framesize.to_be_bytes());
        let crc = crc_ccitt(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());

        let decoded = DataFrame::decode(&buf, &config).unwrap();
        let ts = decoded.timestamp(&config).unwrap();
        assert_eq!(ts.soc(), 1_700_000_000);
        assert!((ts.utc_seconds() - 1_700_000_000.5).abs() < 1e-6);
    }

    #[test]
    fn schema_mismatch_is_detected_when_framesize_disagrees() {
        let format = Format {
            freq_is_float: false,
            analog_is_float: false,
            phasor_is_float: false,
            phasor_is_polar: false,
        };
        let config = config_with(station(format, 1, 0, 0));

        // Body only has enough bytes for a 0-phasor station.
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0i16.to_be_bytes());
        body.extend_from_slice(&0i16.to_be_bytes());

        let buf = frame_bytes(&body);
        assert!(DataFrame::decode(&buf, &config).is_err());
    }
}
