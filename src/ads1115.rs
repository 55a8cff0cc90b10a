//! Texas Instruments ADS1115 16-bit delta-sigma ADC.
//!
//! Four single-ended inputs (or two differential pairs), a programmable
//! gain amplifier and conversion rates from 8 to 860 samples per second.
//! The driver runs the chip in single-shot mode: each
//! [`Ads1115::read`] writes the config register with the start bit set,
//! polls until the conversion completes and reads the result back.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::trace;

/// Default address (ADDR pin to GND). ADDR to VDD/SDA/SCL gives
/// 0x49/0x4A/0x4B.
pub const DEFAULT_ADDR: u8 = 0x48;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

/// OS bit: write starts a conversion, read means "not converting".
const CONFIG_OS: u16 = 1 << 15;
/// Single-shot / power-down mode.
const CONFIG_MODE_SINGLE: u16 = 1 << 8;
/// Comparator disabled.
const CONFIG_COMP_DISABLE: u16 = 0b11;

/// Polling budget for the OS bit. The slowest rate (8 SPS) converts in
/// 125 ms; 150 attempts at 1 ms leaves margin on top of that.
const POLL_INTERVAL_US: u32 = 1000;
const POLL_ATTEMPTS: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
pub enum Error<E> {
    /// Underlying I2C bus error.
    #[error("i2c bus error")]
    I2c(E),
    /// The conversion never completed within the polling budget.
    #[error("conversion timed out")]
    Timeout,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

/// Input multiplexer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum Channel {
    /// AIN0 relative to AIN1.
    DiffA0A1 = 0b000,
    /// AIN0 relative to AIN3.
    DiffA0A3 = 0b001,
    /// AIN1 relative to AIN3.
    DiffA1A3 = 0b010,
    /// AIN2 relative to AIN3.
    DiffA2A3 = 0b011,
    #[default]
    SingleA0 = 0b100,
    SingleA1 = 0b101,
    SingleA2 = 0b110,
    SingleA3 = 0b111,
}

/// Programmable gain amplifier setting, named by full-scale range.
///
/// Inputs must also stay within the supply rails regardless of gain; with
/// a 3.3 V supply the 6.144 V and 4.096 V ranges never reach full scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum Gain {
    Fsr6144 = 0b000,
    Fsr4096 = 0b001,
    #[default]
    Fsr2048 = 0b010,
    Fsr1024 = 0b011,
    Fsr512 = 0b100,
    Fsr256 = 0b101,
}

impl Gain {
    /// Full-scale range in millivolts.
    pub fn full_scale_mv(self) -> i32 {
        match self {
            Gain::Fsr6144 => 6144,
            Gain::Fsr4096 => 4096,
            Gain::Fsr2048 => 2048,
            Gain::Fsr1024 => 1024,
            Gain::Fsr512 => 512,
            Gain::Fsr256 => 256,
        }
    }
}

/// Conversion rate in samples per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum DataRate {
    Sps8 = 0b000,
    Sps16 = 0b001,
    Sps32 = 0b010,
    Sps64 = 0b011,
    #[default]
    Sps128 = 0b100,
    Sps250 = 0b101,
    Sps475 = 0b110,
    Sps860 = 0b111,
}

/// Config register word for one single-shot conversion.
fn config_word(channel: Channel, gain: Gain, rate: DataRate) -> u16 {
    CONFIG_OS
        | (channel as u16) << 12
        | (gain as u16) << 9
        | CONFIG_MODE_SINGLE
        | (rate as u16) << 5
        | CONFIG_COMP_DISABLE
}

/// ADS1115 driver in single-shot mode.
#[derive(Debug)]
pub struct Ads1115<I2C> {
    i2c: I2C,
    address: u8,
    gain: Gain,
    rate: DataRate,
}

impl<I2C, E> Ads1115<I2C>
where
    I2C: I2c<Error = E>,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            gain: Gain::default(),
            rate: DataRate::default(),
        }
    }

    /// Gain for subsequent conversions.
    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
    }

    /// Conversion rate for subsequent conversions.
    pub fn set_data_rate(&mut self, rate: DataRate) {
        self.rate = rate;
    }

    /// One single-shot conversion: raw signed 16-bit counts. Full scale
    /// (+32767) corresponds to the gain's full-scale voltage.
    pub fn read(
        &mut self,
        channel: Channel,
        delay: &mut impl DelayNs,
    ) -> Result<i16, Error<E>> {
        let config = config_word(channel, self.gain, self.rate);
        self.write_reg(REG_CONFIG, config)?;

        let mut attempts = POLL_ATTEMPTS;
        while self.read_reg(REG_CONFIG)? & CONFIG_OS == 0 {
            attempts -= 1;
            if attempts == 0 {
                return Err(Error::Timeout);
            }
            delay.delay_us(POLL_INTERVAL_US);
        }

        let raw = self.read_reg(REG_CONVERSION)? as i16;
        trace!("ads1115: {channel:?} raw {raw}");
        Ok(raw)
    }

    /// One single-shot conversion, scaled to millivolts with the current
    /// gain.
    pub fn read_mv(
        &mut self,
        channel: Channel,
        delay: &mut impl DelayNs,
    ) -> Result<i32, Error<E>> {
        let raw = self.read(channel, delay)?;
        Ok(to_millivolts(raw, self.gain))
    }

    /// Releases the bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_reg(&mut self, reg: u8) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[reg], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write_reg(&mut self, reg: u8, value: u16) -> Result<(), Error<E>> {
        let [msb, lsb] = value.to_be_bytes();
        self.i2c.write(self.address, &[reg, msb, lsb])?;
        Ok(())
    }
}

/// Converts raw counts to millivolts for a gain setting.
pub fn to_millivolts(raw: i16, gain: Gain) -> i32 {
    i32::from(raw) * gain.full_scale_mv() / 32768
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    #[test]
    fn config_word_encodes_all_fields() {
        // AIN0 single-ended, 2.048 V, 128 SPS: the classic 0xC583.
        assert_eq!(
            config_word(Channel::SingleA0, Gain::Fsr2048, DataRate::Sps128),
            0xC583
        );
        assert_eq!(
            config_word(Channel::DiffA0A1, Gain::Fsr6144, DataRate::Sps8),
            0x8103
        );
    }

    #[test]
    fn millivolt_scaling() {
        assert_eq!(to_millivolts(16384, Gain::Fsr2048), 1024);
        assert_eq!(to_millivolts(-16384, Gain::Fsr4096), -2048);
        assert_eq!(to_millivolts(32767, Gain::Fsr6144), 6143);
        assert_eq!(to_millivolts(0, Gain::Fsr256), 0);
    }

    #[test]
    fn single_shot_read() {
        let expectations = [
            // Start conversion on AIN0.
            Transaction::write(DEFAULT_ADDR, vec![REG_CONFIG, 0xC5, 0x83]),
            // First poll: still converting (OS clear).
            Transaction::write_read(DEFAULT_ADDR, vec![REG_CONFIG], vec![0x45, 0x83]),
            // Second poll: done.
            Transaction::write_read(DEFAULT_ADDR, vec![REG_CONFIG], vec![0xC5, 0x83]),
            // Conversion register: 16384 counts.
            Transaction::write_read(DEFAULT_ADDR, vec![REG_CONVERSION], vec![0x40, 0x00]),
        ];
        let i2c = I2cMock::new(&expectations);
        let mut delay = NoopDelay::new();

        let mut adc = Ads1115::new(i2c, DEFAULT_ADDR);
        let mv = adc.read_mv(Channel::SingleA0, &mut delay).unwrap();
        assert_eq!(mv, 1024);

        adc.release().done();
    }

    #[test]
    fn negative_differential_reading() {
        let expectations = [
            Transaction::write(DEFAULT_ADDR, vec![REG_CONFIG, 0x83, 0x83]),
            Transaction::write_read(DEFAULT_ADDR, vec![REG_CONFIG], vec![0x83, 0x83]),
            Transaction::write_read(DEFAULT_ADDR, vec![REG_CONVERSION], vec![0xC0, 0x00]),
        ];
        let i2c = I2cMock::new(&expectations);
        let mut delay = NoopDelay::new();

        let mut adc = Ads1115::new(i2c, DEFAULT_ADDR);
        adc.set_gain(Gain::Fsr4096);
        let mv = adc.read_mv(Channel::DiffA0A1, &mut delay).unwrap();
        assert_eq!(mv, -2048);

        adc.release().done();
    }
}
