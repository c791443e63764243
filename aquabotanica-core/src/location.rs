//! Position fixes from an NMEA 0183 byte stream.

use crate::config::DEFAULT_LOCATION;
use crate::error::Error;
use log::{debug, warn};

/// Longest sentence accepted, NMEA allows 82 characters.
const MAX_SENTENCE: usize = 96;

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Anything that can report the current position.
pub trait LocationSource {
    /// Consume whatever raw input is buffered. Called every loop tick.
    fn drain(&mut self);

    /// Last valid fix, if any.
    fn fix(&self) -> Option<Coordinates>;

    /// Last valid fix, or the configured default position.
    fn fix_or_default(&self) -> Coordinates {
        self.fix().unwrap_or(DEFAULT_LOCATION)
    }
}

/// Assembles NMEA sentences from serial bytes and keeps the last valid fix.
#[derive(Debug, Default)]
pub struct GpsReceiver {
    line: heapless::Vec<u8, MAX_SENTENCE>,
    overflowed: bool,
    fix: Option<Coordinates>,
}

impl GpsReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte from the receiver.
    pub fn encode(&mut self, byte: u8) {
        match byte {
            b'$' => {
                self.line.clear();
                self.overflowed = false;
                let _ = self.line.push(byte);
            }
            b'\r' | b'\n' => {
                if !self.line.is_empty() && !self.overflowed {
                    self.finish_line();
                }
                self.line.clear();
                self.overflowed = false;
            }
            _ => {
                if self.line.push(byte).is_err() {
                    self.overflowed = true;
                }
            }
        }
    }

    pub fn is_valid(&self) -> bool {
        self.fix.is_some()
    }

    /// Latitude of the last fix, 0.0 without one.
    pub fn lat(&self) -> f64 {
        self.fix.map_or(0.0, |fix| fix.latitude)
    }

    /// Longitude of the last fix, 0.0 without one.
    pub fn lng(&self) -> f64 {
        self.fix.map_or(0.0, |fix| fix.longitude)
    }

    pub fn fix(&self) -> Option<Coordinates> {
        self.fix
    }

    fn finish_line(&mut self) {
        let Ok(text) = core::str::from_utf8(&self.line) else {
            return;
        };

        match parse_sentence(text) {
            Ok(Some(fix)) => {
                debug!("GPS fix {:.5}, {:.5}", fix.latitude, fix.longitude);
                self.fix = Some(fix);
            }
            Ok(None) => {}
            Err(e) => warn!("Dropping NMEA sentence: {e}"),
        }
    }
}

/// Decode one NMEA sentence.
///
/// Only `RMC` with status `A` and `GGA` with a non-zero fix quality yield a
/// position; every other well-formed sentence yields `None`.
///
/// # Arguments
/// * `sentence` - A line starting with `$`, with or without `*hh` checksum.
///
/// # Returns
/// * `Result<Option<Coordinates>, Error>` - The fix, if the sentence carries one.
pub fn parse_sentence(sentence: &str) -> Result<Option<Coordinates>, Error> {
    let body = sentence
        .strip_prefix('$')
        .ok_or_else(|| Error::Location(format!("missing '$' in {sentence:?}")))?;

    let body = match body.split_once('*') {
        Some((body, checksum)) => {
            let expected = u8::from_str_radix(checksum.trim(), 16)
                .map_err(|_| Error::Location(format!("bad checksum field {checksum:?}")))?;
            let actual = body.bytes().fold(0u8, |acc, b| acc ^ b);
            if expected != actual {
                return Err(Error::Location(format!(
                    "checksum mismatch: expected {expected:02X}, got {actual:02X}"
                )));
            }
            body
        }
        None => body,
    };

    let fields: heapless::Vec<&str, 24> = body.split(',').take(24).collect();
    let kind = fields.first().copied().unwrap_or_default();
    if kind.len() < 5 {
        return Ok(None);
    }

    let field = |i: usize| fields.get(i).copied().unwrap_or_default();

    let (valid, lat, ns, lon, ew) = match kind.get(kind.len() - 3..) {
        Some("RMC") => (field(2) == "A", field(3), field(4), field(5), field(6)),
        Some("GGA") => (
            field(6).parse::<u8>().is_ok_and(|quality| quality > 0),
            field(2),
            field(3),
            field(4),
            field(5),
        ),
        _ => return Ok(None),
    };

    if !valid {
        return Ok(None);
    }

    Ok(Some(Coordinates {
        latitude: degrees(lat, ns, 'S')?,
        longitude: degrees(lon, ew, 'W')?,
    }))
}

/// Convert `[d]ddmm.mmmm` plus hemisphere to signed decimal degrees.
fn degrees(value: &str, hemisphere: &str, negative: char) -> Result<f64, Error> {
    let raw: f64 = value
        .parse()
        .map_err(|_| Error::Location(format!("bad coordinate {value:?}")))?;
    let whole = (raw / 100.0).trunc();
    let decimal = whole + (raw - whole * 100.0) / 60.0;

    Ok(if hemisphere.starts_with(negative) {
        -decimal
    } else {
        decimal
    })
}
