//! NXP PCA9685 16-channel, 12-bit PWM controller.
//!
//! The usual I2C front-end for servo hats and motor driver boards. Each
//! channel gets an on-tick and an off-tick inside a 4096-tick frame; the
//! frame rate is set by a prescaler off the internal 25 MHz oscillator.
//!
//! Prescale writes only take effect while the oscillator sleeps, so
//! [`Pca9685::set_pwm_freq`] runs the sleep / write / wake / restart
//! sequence the datasheet prescribes.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::debug;

/// Default address (all address pins low).
pub const DEFAULT_ADDR: u8 = 0x40;

/// Ticks per PWM frame.
pub const FRAME_TICKS: u16 = 4096;
/// Internal oscillator frequency.
const OSC_HZ: u32 = 25_000_000;

mod regs {
    pub const MODE1: u8 = 0x00;
    pub const MODE2: u8 = 0x01;
    pub const LED0_ON_L: u8 = 0x06;
    pub const ALL_LED_ON_L: u8 = 0xFA;
    pub const PRE_SCALE: u8 = 0xFE;
}

/// MODE1 bits.
const MODE1_RESTART: u8 = 1 << 7;
const MODE1_AUTO_INC: u8 = 1 << 5;
const MODE1_SLEEP: u8 = 1 << 4;

/// MODE2 OUTDRV: totem-pole outputs when set, open-drain when clear.
const MODE2_OUTDRV: u8 = 1 << 2;

/// Bit 4 of the ON/OFF high byte forces the channel fully on/off.
const LED_FULL: u8 = 1 << 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
pub enum Error<E> {
    /// Underlying I2C bus error.
    #[error("i2c bus error")]
    I2c(E),
    /// Channel index not in 0..=15.
    #[error("channel index out of range")]
    InvalidChannel,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

/// Output stage configuration (MODE2 OUTDRV). Totem-pole is the power-on
/// default and what servo hats expect; open-drain suits externally
/// pulled-up LED rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputDrive {
    #[default]
    TotemPole,
    OpenDrain,
}

/// Prescale register value for a target frame rate, rounded to nearest.
/// The hardware range (3..=255) maps to roughly 24..=1526 Hz.
fn prescale_for(freq_hz: u16) -> u8 {
    let denom = u32::from(FRAME_TICKS) * u32::from(freq_hz.max(1));
    let rounded = (OSC_HZ + denom / 2) / denom;
    rounded.saturating_sub(1).clamp(3, 255) as u8
}

/// PCA9685 driver.
#[derive(Debug)]
pub struct Pca9685<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Pca9685<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Wakes the chip and enables register auto-increment, which the
    /// 4-byte channel writes rely on.
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<E>> {
        let mut driver = Self { i2c, address };
        driver.write_reg(regs::MODE1, MODE1_AUTO_INC)?;
        Ok(driver)
    }

    /// Configures the output stage, preserving the inversion/update bits.
    pub fn set_output_drive(&mut self, drive: OutputDrive) -> Result<(), Error<E>> {
        let value = match drive {
            OutputDrive::TotemPole => MODE2_OUTDRV,
            OutputDrive::OpenDrain => 0,
        };
        let mode2 = self.read_reg(regs::MODE2)?;
        self.write_reg(regs::MODE2, (mode2 & !MODE2_OUTDRV) | value)
    }

    /// Sets the PWM frame rate, 24..=1526 Hz. All channels share it.
    ///
    /// The oscillator is put to sleep around the prescale write and
    /// restarted afterwards; channels resume their programmed waveforms.
    pub fn set_pwm_freq(
        &mut self,
        freq_hz: u16,
        delay: &mut impl DelayNs,
    ) -> Result<(), Error<E>> {
        let prescale = prescale_for(freq_hz);
        debug!("pca9685: {freq_hz} Hz -> prescale {prescale}");

        let mode1 = self.read_reg(regs::MODE1)?;
        let sleeping = (mode1 & !MODE1_RESTART) | MODE1_SLEEP;
        self.write_reg(regs::MODE1, sleeping)?;
        self.write_reg(regs::PRE_SCALE, prescale)?;
        self.write_reg(regs::MODE1, mode1 & !MODE1_SLEEP)?;
        // Oscillator needs 500 us to stabilize before restart is valid.
        delay.delay_us(500);
        self.write_reg(regs::MODE1, (mode1 & !MODE1_SLEEP) | MODE1_RESTART)?;
        Ok(())
    }

    /// Programs the raw on/off tick pair of one channel. Ticks above 4095
    /// set the full-on / full-off override bit.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Error<E>> {
        let reg = channel_reg(channel)?;
        self.write_channel(reg, on, off)
    }

    /// Duty cycle in ticks out of 4096. 0 parks the channel fully off and
    /// 4096 (or more) fully on, using the override bits so the output is
    /// completely static.
    pub fn set_duty(&mut self, channel: u8, ticks: u16) -> Result<(), Error<E>> {
        let reg = channel_reg(channel)?;
        match ticks {
            0 => self.write_channel_raw(reg, [0, 0, 0, LED_FULL]),
            t if t >= FRAME_TICKS => self.write_channel_raw(reg, [0, LED_FULL, 0, 0]),
            t => self.write_channel(reg, 0, t),
        }
    }

    /// Programs every channel at once through the ALL_LED registers.
    pub fn set_all(&mut self, on: u16, off: u16) -> Result<(), Error<E>> {
        self.write_channel(regs::ALL_LED_ON_L, on, off)
    }

    /// Parks every channel fully off.
    pub fn all_off(&mut self) -> Result<(), Error<E>> {
        self.write_channel_raw(regs::ALL_LED_ON_L, [0, 0, 0, LED_FULL])
    }

    /// Releases the bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write_channel(&mut self, reg: u8, on: u16, off: u16) -> Result<(), Error<E>> {
        let on = on.min(u16::from(LED_FULL) << 8 | 0xFF);
        let off = off.min(u16::from(LED_FULL) << 8 | 0xFF);
        self.write_channel_raw(
            reg,
            [on as u8, (on >> 8) as u8, off as u8, (off >> 8) as u8],
        )
    }

    fn write_channel_raw(&mut self, reg: u8, bytes: [u8; 4]) -> Result<(), Error<E>> {
        self.i2c.write(
            self.address,
            &[reg, bytes[0], bytes[1], bytes[2], bytes[3]],
        )?;
        Ok(())
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(self.address, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c.write(self.address, &[reg, value])?;
        Ok(())
    }
}

fn channel_reg<E>(channel: u8) -> Result<u8, Error<E>> {
    if channel > 15 {
        return Err(Error::InvalidChannel);
    }
    Ok(regs::LED0_ON_L + 4 * channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    #[test]
    fn prescale_rounds_to_nearest() {
        assert_eq!(prescale_for(50), 121); // servo rate
        assert_eq!(prescale_for(60), 101);
        assert_eq!(prescale_for(1000), 5);
    }

    #[test]
    fn prescale_clamps_to_hardware_range() {
        assert_eq!(prescale_for(1526), 3);
        assert_eq!(prescale_for(10000), 3);
        assert_eq!(prescale_for(24), 253);
        assert_eq!(prescale_for(1), 255);
    }

    fn new_driver(extra: &[Transaction]) -> Pca9685<I2cMock> {
        let mut expectations = vec![Transaction::write(
            DEFAULT_ADDR,
            vec![regs::MODE1, MODE1_AUTO_INC],
        )];
        expectations.extend_from_slice(extra);
        Pca9685::new(I2cMock::new(&expectations), DEFAULT_ADDR).unwrap()
    }

    #[test]
    fn frequency_change_sequences_sleep_and_restart() {
        let mut pwm = new_driver(&[
            Transaction::write_read(DEFAULT_ADDR, vec![regs::MODE1], vec![MODE1_AUTO_INC]),
            // Sleep, write prescale, wake, then restart after the delay.
            Transaction::write(DEFAULT_ADDR, vec![regs::MODE1, MODE1_AUTO_INC | MODE1_SLEEP]),
            Transaction::write(DEFAULT_ADDR, vec![regs::PRE_SCALE, 121]),
            Transaction::write(DEFAULT_ADDR, vec![regs::MODE1, MODE1_AUTO_INC]),
            Transaction::write(
                DEFAULT_ADDR,
                vec![regs::MODE1, MODE1_AUTO_INC | MODE1_RESTART],
            ),
        ]);
        pwm.set_pwm_freq(50, &mut NoopDelay::new()).unwrap();
        pwm.release().done();
    }

    #[test]
    fn duty_writes_tick_pair() {
        let mut pwm = new_driver(&[Transaction::write(
            DEFAULT_ADDR,
            // Channel 2 at LED0 + 4*2, on=0, off=2048.
            vec![regs::LED0_ON_L + 8, 0x00, 0x00, 0x00, 0x08],
        )]);
        pwm.set_duty(2, 2048).unwrap();
        pwm.release().done();
    }

    #[test]
    fn duty_extremes_use_override_bits() {
        let mut pwm = new_driver(&[
            Transaction::write(
                DEFAULT_ADDR,
                vec![regs::LED0_ON_L, 0x00, 0x00, 0x00, LED_FULL],
            ),
            Transaction::write(
                DEFAULT_ADDR,
                vec![regs::LED0_ON_L, 0x00, LED_FULL, 0x00, 0x00],
            ),
        ]);
        pwm.set_duty(0, 0).unwrap();
        pwm.set_duty(0, 4096).unwrap();
        pwm.release().done();
    }

    #[test]
    fn output_drive_preserves_other_mode2_bits() {
        let mut pwm = new_driver(&[
            // INVRT (bit 4) stays put while OUTDRV is cleared.
            Transaction::write_read(DEFAULT_ADDR, vec![regs::MODE2], vec![0x14]),
            Transaction::write(DEFAULT_ADDR, vec![regs::MODE2, 0x10]),
        ]);
        pwm.set_output_drive(OutputDrive::OpenDrain).unwrap();
        pwm.release().done();
    }

    #[test]
    fn rejects_channel_out_of_range() {
        let mut pwm = new_driver(&[]);
        assert_eq!(pwm.set_duty(16, 100).err().unwrap(), Error::InvalidChannel);
        pwm.release().done();
    }

    #[test]
    fn all_off_uses_broadcast_registers() {
        let mut pwm = new_driver(&[Transaction::write(
            DEFAULT_ADDR,
            vec![regs::ALL_LED_ON_L, 0x00, 0x00, 0x00, LED_FULL],
        )]);
        pwm.all_off().unwrap();
        pwm.release().done();
    }
}
