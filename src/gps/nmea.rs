//! Incremental NMEA 0183 sentence assembly and parsing.
//!
//! [`SentenceReader`] consumes the receiver's byte stream one byte at a
//! time, frames `$...*hh` sentences in a bounded buffer, verifies the XOR
//! checksum and hands complete sentences to the field parsers. Garbage,
//! truncated sentences and checksum failures all just resynchronize on the
//! next `$`.
//!
//! Only GGA (position/altitude/satellites) and RMC (position/speed/date)
//! are decoded; every other sentence type is counted and dropped.

use heapless::String;
use log::trace;

/// NMEA 0183 caps sentences at 82 characters including `$` and CRLF.
const MAX_SENTENCE: usize = 82;

/// Time of day from a `hhmmss[.sss]` field. Fractional seconds are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Calendar date from a `ddmmyy` field. Years are mapped into 2000..=2099.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// Decoded GGA sentence: the fix itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Gga {
    pub time: Option<TimeOfDay>,
    /// Decimal degrees, south negative.
    pub latitude: Option<f64>,
    /// Decimal degrees, west negative.
    pub longitude: Option<f64>,
    /// 0 = no fix, 1 = GPS, 2 = differential.
    pub quality: u8,
    pub satellites: u8,
    pub hdop: Option<f64>,
    /// Altitude above mean sea level in meters.
    pub altitude_m: Option<f64>,
}

/// Decoded RMC sentence: position, ground speed and date.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rmc {
    pub time: Option<TimeOfDay>,
    /// Receiver's own validity flag (`A` = valid).
    pub valid: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    /// Course over ground in degrees true.
    pub course_deg: Option<f64>,
    pub date: Option<Date>,
}

/// One successfully parsed sentence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sentence {
    Gga(Gga),
    Rmc(Rmc),
}

#[derive(Debug, Default)]
enum State {
    /// Waiting for a `$`.
    #[default]
    Idle,
    /// Accumulating sentence body (between `$` and line end).
    Collecting,
}

/// Streaming sentence framer. Feed it bytes; it occasionally yields a
/// [`Sentence`].
#[derive(Debug, Default)]
pub struct SentenceReader {
    state: State,
    buf: String<MAX_SENTENCE>,
}

impl SentenceReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one byte of receiver output. Returns a sentence when this
    /// byte completes a valid GGA or RMC.
    pub fn push(&mut self, byte: u8) -> Option<Sentence> {
        match byte {
            b'$' => {
                // A new start always wins, even mid-sentence.
                self.state = State::Collecting;
                self.buf.clear();
                None
            }
            b'\r' | b'\n' => {
                if matches!(self.state, State::Idle) {
                    return None;
                }
                self.state = State::Idle;
                let sentence = parse(self.buf.as_str());
                self.buf.clear();
                sentence
            }
            0x20..=0x7E => {
                if matches!(self.state, State::Collecting)
                    && self.buf.push(byte as char).is_err()
                {
                    // Oversized sentence is garbage; resync on next `$`.
                    trace!("nmea: oversized sentence dropped");
                    self.state = State::Idle;
                    self.buf.clear();
                }
                None
            }
            // Non-printable bytes never occur inside a sentence.
            _ => {
                self.state = State::Idle;
                self.buf.clear();
                None
            }
        }
    }
}

/// Parses one framed sentence body (no `$`, no line ending), verifying
/// the trailing `*hh` checksum.
fn parse(body: &str) -> Option<Sentence> {
    let (payload, checksum) = body.rsplit_once('*')?;
    let expected = u8::from_str_radix(checksum, 16).ok()?;
    let actual = payload.bytes().fold(0u8, |acc, b| acc ^ b);
    if actual != expected {
        trace!("nmea: checksum mismatch, dropping sentence");
        return None;
    }

    let mut fields = payload.split(',');
    let kind = fields.next()?;
    // Talker prefix (GP/GN/GL...) varies by constellation; match the type.
    match kind.get(2..)? {
        "GGA" => parse_gga(fields).map(Sentence::Gga),
        "RMC" => parse_rmc(fields).map(Sentence::Rmc),
        _ => None,
    }
}

fn parse_gga<'a>(mut fields: impl Iterator<Item = &'a str>) -> Option<Gga> {
    let time = parse_time(fields.next()?);
    let latitude = parse_angle(fields.next()?, fields.next()?, 2);
    let longitude = parse_angle(fields.next()?, fields.next()?, 3);
    let quality = fields.next()?.parse().unwrap_or(0);
    let satellites = fields.next()?.parse().unwrap_or(0);
    let hdop = fields.next()?.parse().ok();
    let altitude_m = fields.next()?.parse().ok();
    Some(Gga {
        time,
        latitude,
        longitude,
        quality,
        satellites,
        hdop,
        altitude_m,
    })
}

fn parse_rmc<'a>(mut fields: impl Iterator<Item = &'a str>) -> Option<Rmc> {
    let time = parse_time(fields.next()?);
    let valid = fields.next()? == "A";
    let latitude = parse_angle(fields.next()?, fields.next()?, 2);
    let longitude = parse_angle(fields.next()?, fields.next()?, 3);
    let speed_knots = fields.next()?.parse().ok();
    let course_deg = fields.next()?.parse().ok();
    let date = parse_date(fields.next()?);
    Some(Rmc {
        time,
        valid,
        latitude,
        longitude,
        speed_knots,
        course_deg,
        date,
    })
}

/// `hhmmss[.sss]` to time of day.
fn parse_time(field: &str) -> Option<TimeOfDay> {
    let digits = field.split('.').next()?;
    if digits.len() != 6 {
        return None;
    }
    Some(TimeOfDay {
        hour: digits.get(0..2)?.parse().ok()?,
        minute: digits.get(2..4)?.parse().ok()?,
        second: digits.get(4..6)?.parse().ok()?,
    })
}

/// `ddmmyy` to date.
fn parse_date(field: &str) -> Option<Date> {
    if field.len() != 6 {
        return None;
    }
    Some(Date {
        day: field.get(0..2)?.parse().ok()?,
        month: field.get(2..4)?.parse().ok()?,
        year: 2000 + field.get(4..6)?.parse::<u16>().ok()?,
    })
}

/// NMEA `(d)ddmm.mmmm` angle plus hemisphere letter to signed decimal
/// degrees. `deg_digits` is 2 for latitude and 3 for longitude.
fn parse_angle(field: &str, hemisphere: &str, deg_digits: usize) -> Option<f64> {
    if field.len() < deg_digits {
        return None;
    }
    let degrees: f64 = field.get(..deg_digits)?.parse().ok()?;
    let minutes: f64 = field.get(deg_digits..)?.parse().ok()?;
    let value = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(value),
        "S" | "W" => Some(-value),
        _ => None,
    }
}
