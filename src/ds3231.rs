//! Maxim DS3231 temperature-compensated real-time clock.
//!
//! Keeps civil time in seven BCD registers, runs from a battery backup
//! when main power drops, and flags that interruption through the
//! oscillator-stop flag (OSF). The usual lifecycle is: check
//! [`Ds3231::has_lost_time`] at startup, set the clock from a trusted
//! source if it did, then [`Ds3231::datetime`] whenever a timestamp is
//! needed.
//!
//! The driver always runs the clock in 24-hour mode. Years cover
//! 2000..=2099; the century bit is ignored.

use embedded_hal::i2c::I2c;
use log::debug;

/// Fixed I2C address.
pub const ADDR: u8 = 0x68;

mod regs {
    pub const SECONDS: u8 = 0x00;
    pub const CONTROL: u8 = 0x0E;
    pub const STATUS: u8 = 0x0F;
    pub const TEMP_MSB: u8 = 0x11;
}

/// Control register bits.
const CONTROL_INTCN: u8 = 1 << 2;
const CONTROL_RS_MASK: u8 = 0b11 << 3;
/// Status register bits.
const STATUS_OSF: u8 = 1 << 7;
const STATUS_EN32KHZ: u8 = 1 << 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
pub enum Error<E> {
    /// Underlying I2C bus error.
    #[error("i2c bus error")]
    I2c(E),
    /// A datetime field passed to [`Ds3231::set_datetime`] is out of
    /// range.
    #[error("datetime field out of range")]
    InvalidDateTime,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

/// Square-wave output frequency on the INT/SQW pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SquareWave {
    #[default]
    Hz1 = 0b00,
    Hz1024 = 0b01,
    Hz4096 = 0b10,
    Hz8192 = 0b11,
}

/// Calendar date and wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DateTime {
    /// Full year, 2000..=2099.
    pub year: u16,
    /// 1..=12.
    pub month: u8,
    /// 1..=31.
    pub day: u8,
    /// Day of week 1..=7. The chip only increments it; which day is 1 is
    /// the application's convention.
    pub weekday: u8,
    /// 0..=23.
    pub hour: u8,
    /// 0..=59.
    pub minute: u8,
    /// 0..=59.
    pub second: u8,
}

impl DateTime {
    fn validate(&self) -> bool {
        (2000..=2099).contains(&self.year)
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && (1..=7).contains(&self.weekday)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 59
    }
}

fn bcd_to_dec(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

fn dec_to_bcd(dec: u8) -> u8 {
    (dec / 10) << 4 | (dec % 10)
}

/// DS3231 driver.
#[derive(Debug)]
pub struct Ds3231<I2C> {
    i2c: I2C,
}

impl<I2C, E> Ds3231<I2C>
where
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Reads the seven timekeeping registers in one burst.
    pub fn datetime(&mut self) -> Result<DateTime, Error<E>> {
        let mut buf = [0u8; 7];
        self.i2c.write_read(ADDR, &[regs::SECONDS], &mut buf)?;
        Ok(DateTime {
            second: bcd_to_dec(buf[0] & 0x7F),
            minute: bcd_to_dec(buf[1] & 0x7F),
            // Bit 6 selects 12-hour mode; masked off since we never set it.
            hour: bcd_to_dec(buf[2] & 0x3F),
            weekday: buf[3] & 0x07,
            day: bcd_to_dec(buf[4] & 0x3F),
            month: bcd_to_dec(buf[5] & 0x1F),
            year: 2000 + u16::from(bcd_to_dec(buf[6])),
        })
    }

    /// Sets the clock and clears the oscillator-stop flag, since the time
    /// is now trusted again.
    pub fn set_datetime(&mut self, dt: &DateTime) -> Result<(), Error<E>> {
        if !dt.validate() {
            return Err(Error::InvalidDateTime);
        }
        self.i2c.write(
            ADDR,
            &[
                regs::SECONDS,
                dec_to_bcd(dt.second),
                dec_to_bcd(dt.minute),
                dec_to_bcd(dt.hour),
                dt.weekday,
                dec_to_bcd(dt.day),
                dec_to_bcd(dt.month),
                dec_to_bcd((dt.year - 2000) as u8),
            ],
        )?;
        self.clear_osf()?;
        debug!("ds3231: clock set to {}-{:02}-{:02}", dt.year, dt.month, dt.day);
        Ok(())
    }

    /// True when the oscillator stopped since the flag was last cleared,
    /// meaning the kept time cannot be trusted.
    pub fn has_lost_time(&mut self) -> Result<bool, Error<E>> {
        Ok(self.read_reg(regs::STATUS)? & STATUS_OSF != 0)
    }

    fn clear_osf(&mut self) -> Result<(), Error<E>> {
        self.update_reg(regs::STATUS, STATUS_OSF, 0)
    }

    /// Die temperature in 1/100 degree Celsius, 0.25 degree resolution.
    /// This is the value the chip's own crystal compensation uses.
    pub fn temperature_centi_celsius(&mut self) -> Result<i32, Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(ADDR, &[regs::TEMP_MSB], &mut buf)?;
        // 10-bit two's complement, LSB = 0.25 C.
        let raw = i32::from(buf[0] as i8) << 2 | i32::from(buf[1] >> 6);
        Ok(raw * 25)
    }

    /// Routes a square wave of the given frequency to the INT/SQW pin.
    pub fn enable_square_wave(&mut self, freq: SquareWave) -> Result<(), Error<E>> {
        self.update_reg(
            regs::CONTROL,
            CONTROL_RS_MASK | CONTROL_INTCN,
            (freq as u8) << 3,
        )
    }

    /// Returns the INT/SQW pin to interrupt duty (the power-on default).
    pub fn disable_square_wave(&mut self) -> Result<(), Error<E>> {
        self.update_reg(regs::CONTROL, CONTROL_INTCN, CONTROL_INTCN)
    }

    /// Enables or disables the dedicated 32.768 kHz output pin.
    pub fn set_32khz_output(&mut self, enabled: bool) -> Result<(), Error<E>> {
        let value = if enabled { STATUS_EN32KHZ } else { 0 };
        self.update_reg(regs::STATUS, STATUS_EN32KHZ, value)
    }

    /// Releases the bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(ADDR, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    /// Read-modify-write keeping the bits outside `mask` untouched.
    fn update_reg(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), Error<E>> {
        let current = self.read_reg(reg)?;
        self.i2c
            .write(ADDR, &[reg, (current & !mask) | (value & mask)])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    #[test]
    fn bcd_round_trip() {
        assert_eq!(bcd_to_dec(0x59), 59);
        assert_eq!(bcd_to_dec(0x00), 0);
        assert_eq!(dec_to_bcd(59), 0x59);
        assert_eq!(dec_to_bcd(7), 0x07);
        for v in 0..100 {
            assert_eq!(bcd_to_dec(dec_to_bcd(v)), v);
        }
    }

    #[test]
    fn reads_datetime() {
        // 2026-08-29 (Saturday) 14:37:52
        let expectations = [Transaction::write_read(
            ADDR,
            vec![regs::SECONDS],
            vec![0x52, 0x37, 0x14, 0x06, 0x29, 0x08, 0x26],
        )];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        let dt = rtc.datetime().unwrap();
        assert_eq!(
            dt,
            DateTime {
                year: 2026,
                month: 8,
                day: 29,
                weekday: 6,
                hour: 14,
                minute: 37,
                second: 52,
            }
        );
        rtc.release().done();
    }

    #[test]
    fn writes_datetime_and_clears_osf() {
        let expectations = [
            Transaction::write(
                ADDR,
                vec![regs::SECONDS, 0x00, 0x30, 0x09, 0x01, 0x01, 0x01, 0x24],
            ),
            // OSF clear: read status with OSF set, write it back clear.
            Transaction::write_read(ADDR, vec![regs::STATUS], vec![0x88]),
            Transaction::write(ADDR, vec![regs::STATUS, 0x08]),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));

        let dt = DateTime {
            year: 2024,
            month: 1,
            day: 1,
            weekday: 1,
            hour: 9,
            minute: 30,
            second: 0,
        };
        rtc.set_datetime(&dt).unwrap();
        rtc.release().done();
    }

    #[test]
    fn rejects_invalid_datetime() {
        let mut rtc = Ds3231::new(I2cMock::new(&[]));
        let err = rtc
            .set_datetime(&DateTime {
                year: 2024,
                month: 13,
                day: 1,
                weekday: 1,
                hour: 0,
                minute: 0,
                second: 0,
            })
            .err()
            .unwrap();
        assert_eq!(err, Error::InvalidDateTime);
        rtc.release().done();
    }

    #[test]
    fn reports_lost_time() {
        let expectations = [
            Transaction::write_read(ADDR, vec![regs::STATUS], vec![0x80]),
            Transaction::write_read(ADDR, vec![regs::STATUS], vec![0x00]),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));
        assert!(rtc.has_lost_time().unwrap());
        assert!(!rtc.has_lost_time().unwrap());
        rtc.release().done();
    }

    #[test]
    fn temperature_quarter_degree_steps() {
        // +25.25 C: msb 25, lsb top bits 01.
        let expectations = [
            Transaction::write_read(ADDR, vec![regs::TEMP_MSB], vec![0x19, 0x40]),
            // -10.5 C: raw -42 quarter-degrees = 0b11_1101_0110 -> msb 0xF5, lsb 0b10 << 6
            Transaction::write_read(ADDR, vec![regs::TEMP_MSB], vec![0xF5, 0x80]),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));
        assert_eq!(rtc.temperature_centi_celsius().unwrap(), 2525);
        assert_eq!(rtc.temperature_centi_celsius().unwrap(), -1050);
        rtc.release().done();
    }

    #[test]
    fn square_wave_control() {
        let expectations = [
            // Enable 1.024 kHz: clear INTCN, RS = 01.
            Transaction::write_read(ADDR, vec![regs::CONTROL], vec![0x1C]),
            Transaction::write(ADDR, vec![regs::CONTROL, 0x08]),
            // Disable: set INTCN back.
            Transaction::write_read(ADDR, vec![regs::CONTROL], vec![0x08]),
            Transaction::write(ADDR, vec![regs::CONTROL, 0x0C]),
        ];
        let mut rtc = Ds3231::new(I2cMock::new(&expectations));
        rtc.enable_square_wave(SquareWave::Hz1024).unwrap();
        rtc.disable_square_wave().unwrap();
        rtc.release().done();
    }
}
