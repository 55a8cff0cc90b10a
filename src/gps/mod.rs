//! u-blox GPS receiver on the I2C bus (the interface u-blox calls DDC).
//!
//! The receiver exposes a byte stream through three registers: a
//! big-endian 16-bit "bytes available" count at 0xFD/0xFE and the stream
//! itself at 0xFF. Reading the stream past the available count yields
//! 0xFF filler, which also never occurs inside NMEA text, so filler is
//! simply discarded.
//!
//! [`UbloxGps::poll`] drains whatever the receiver has buffered through
//! the NMEA reader in [`nmea`] and folds decoded sentences into a [`Fix`]
//! snapshot; [`UbloxGps::wait_for_fix`] polls until the snapshot carries a
//! position or a timeout budget runs out.

pub mod nmea;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, trace};

use nmea::{Date, Sentence, SentenceReader, TimeOfDay};

/// Default u-blox DDC address.
pub const DEFAULT_ADDR: u8 = 0x42;

mod regs {
    /// Bytes-available count, big-endian u16 at 0xFD/0xFE.
    pub const BYTES_AVAILABLE: u8 = 0xFD;
    /// Data stream; reads past the available count return 0xFF.
    pub const DATA_STREAM: u8 = 0xFF;
}

/// Stream bytes fetched per bus transaction.
const CHUNK_LEN: usize = 32;
/// Pause between polls in [`UbloxGps::wait_for_fix`].
const POLL_INTERVAL_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
pub enum Error<E> {
    /// Underlying I2C bus error.
    #[error("i2c bus error")]
    I2c(E),
    /// No position fix arrived within the timeout budget.
    #[error("no fix within timeout")]
    Timeout,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

/// Best-known navigation state, merged from GGA and RMC sentences.
///
/// Fields are `None` until a sentence carrying them has been decoded; the
/// receiver keeps sending sentences with empty position fields until it
/// acquires satellites.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fix {
    /// Decimal degrees, south negative.
    pub latitude: Option<f64>,
    /// Decimal degrees, west negative.
    pub longitude: Option<f64>,
    /// Meters above mean sea level (GGA).
    pub altitude_m: Option<f64>,
    /// Fix quality from GGA: 0 = none, 1 = GPS, 2 = differential.
    pub quality: u8,
    /// Satellites used in the fix (GGA).
    pub satellites: u8,
    /// Horizontal dilution of precision (GGA).
    pub hdop: Option<f64>,
    /// Ground speed in knots (RMC).
    pub speed_knots: Option<f64>,
    /// Course over ground in degrees true (RMC).
    pub course_deg: Option<f64>,
    /// UTC time of the last decoded sentence.
    pub time: Option<TimeOfDay>,
    /// UTC date (RMC).
    pub date: Option<Date>,
}

impl Fix {
    /// True once the snapshot carries an actual position.
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    fn apply(&mut self, sentence: Sentence) {
        match sentence {
            Sentence::Gga(gga) => {
                self.quality = gga.quality;
                self.satellites = gga.satellites;
                if gga.quality > 0 {
                    self.latitude = gga.latitude;
                    self.longitude = gga.longitude;
                    self.altitude_m = gga.altitude_m;
                    self.hdop = gga.hdop;
                } else {
                    // Position data is stale once the fix is lost.
                    self.latitude = None;
                    self.longitude = None;
                }
                if gga.time.is_some() {
                    self.time = gga.time;
                }
            }
            Sentence::Rmc(rmc) => {
                if rmc.valid {
                    self.latitude = rmc.latitude;
                    self.longitude = rmc.longitude;
                    self.speed_knots = rmc.speed_knots;
                    self.course_deg = rmc.course_deg;
                    self.date = rmc.date;
                } else {
                    self.latitude = None;
                    self.longitude = None;
                }
                if rmc.time.is_some() {
                    self.time = rmc.time;
                }
            }
        }
    }
}

/// u-blox DDC driver.
#[derive(Debug)]
pub struct UbloxGps<I2C> {
    i2c: I2C,
    address: u8,
    reader: SentenceReader,
    fix: Fix,
}

impl<I2C, E> UbloxGps<I2C>
where
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            reader: SentenceReader::new(),
            fix: Fix::default(),
        }
    }

    /// Bytes the receiver currently has buffered for us.
    pub fn bytes_available(&mut self) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[regs::BYTES_AVAILABLE], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Drains everything the receiver has buffered and folds decoded
    /// sentences into the [`Fix`] snapshot. Returns true when at least one
    /// sentence was decoded.
    pub fn poll(&mut self) -> Result<bool, Error<E>> {
        let mut remaining = self.bytes_available()?;
        trace!("gps: {remaining} bytes pending");
        let mut decoded = false;

        while remaining > 0 {
            let n = usize::from(remaining.min(CHUNK_LEN as u16));
            let mut chunk = [0u8; CHUNK_LEN];
            self.i2c
                .write_read(self.address, &[regs::DATA_STREAM], &mut chunk[..n])?;
            for &byte in &chunk[..n] {
                if byte == 0xFF {
                    continue;
                }
                if let Some(sentence) = self.reader.push(byte) {
                    self.fix.apply(sentence);
                    decoded = true;
                }
            }
            remaining -= n as u16;
        }
        Ok(decoded)
    }

    /// The current navigation snapshot. Call [`poll`](Self::poll) to
    /// refresh it.
    pub fn fix(&self) -> Fix {
        self.fix
    }

    /// Polls until the receiver reports a position, giving up after
    /// `timeout_ms`. Cold starts commonly need tens of seconds under open
    /// sky.
    pub fn wait_for_fix(
        &mut self,
        timeout_ms: u32,
        delay: &mut impl DelayNs,
    ) -> Result<Fix, Error<E>> {
        let mut budget_ms = timeout_ms;
        loop {
            self.poll()?;
            if self.fix.has_position() {
                debug!(
                    "gps: fix acquired, {} satellites, quality {}",
                    self.fix.satellites, self.fix.quality
                );
                return Ok(self.fix);
            }
            if budget_ms < POLL_INTERVAL_MS {
                return Err(Error::Timeout);
            }
            delay.delay_ms(POLL_INTERVAL_MS);
            budget_ms -= POLL_INTERVAL_MS;
        }
    }

    /// Releases the bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }
}
