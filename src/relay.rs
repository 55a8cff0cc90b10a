//! Seeed Studio multi-channel relay board.
//!
//! The board's onboard MCU speaks a tiny command protocol: one command
//! byte, optionally followed by a payload. Channel control is a single
//! bitmask write, so the driver keeps a shadow copy of the mask and edits
//! it per channel; there is no way to read the relay state back.
//!
//! Boards ship as 4- or 8-channel variants; pass the channel count to
//! [`Relay::new`] so out-of-range channels are caught locally.

use embedded_hal::i2c::I2c;
use log::debug;

/// Factory-default address. [`Relay::change_address`] can move it.
pub const DEFAULT_ADDR: u8 = 0x11;

mod cmd {
    /// Writes the channel bitmask, bit 0 = channel 1.
    pub const CHANNEL_CTRL: u8 = 0x10;
    /// Persists a new I2C address to the board's flash.
    pub const SAVE_I2C_ADDR: u8 = 0x11;
    /// Reads the firmware version byte.
    pub const READ_FIRMWARE_VER: u8 = 0x13;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
pub enum Error<E> {
    /// Underlying I2C bus error.
    #[error("i2c bus error")]
    I2c(E),
    /// Channel number not in 1..=channel count.
    #[error("channel number out of range")]
    InvalidChannel,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

/// Multi-channel relay driver. Channels are numbered from 1, matching the
/// board's silkscreen.
#[derive(Debug)]
pub struct Relay<I2C> {
    i2c: I2C,
    address: u8,
    channels: u8,
    /// Shadow of the board's channel bitmask.
    state: u8,
}

impl<I2C, E> Relay<I2C>
where
    I2C: I2c<Error = E>,
{
    /// `channels` is the board variant, 4 or 8. The shadow mask starts at
    /// all-off; call [`all_off`](Self::all_off) first if the board may
    /// have relays latched from a previous run.
    pub fn new(i2c: I2C, address: u8, channels: u8) -> Self {
        Self {
            i2c,
            address,
            channels: channels.min(8),
            state: 0,
        }
    }

    pub fn on(&mut self, channel: u8) -> Result<(), Error<E>> {
        let bit = self.channel_bit(channel)?;
        self.write_mask(self.state | bit)
    }

    pub fn off(&mut self, channel: u8) -> Result<(), Error<E>> {
        let bit = self.channel_bit(channel)?;
        self.write_mask(self.state & !bit)
    }

    pub fn toggle(&mut self, channel: u8) -> Result<(), Error<E>> {
        let bit = self.channel_bit(channel)?;
        self.write_mask(self.state ^ bit)
    }

    /// Shadowed state of one channel. Reflects what this driver wrote,
    /// not a readback.
    pub fn is_on(&self, channel: u8) -> Result<bool, Error<E>> {
        let bit = self.channel_bit(channel)?;
        Ok(self.state & bit != 0)
    }

    /// Writes a whole bitmask at once, bit 0 = channel 1. Bits beyond the
    /// board's channel count are ignored.
    pub fn set_mask(&mut self, mask: u8) -> Result<(), Error<E>> {
        let valid = if self.channels == 8 {
            0xFF
        } else {
            (1 << self.channels) - 1
        };
        self.write_mask(mask & valid)
    }

    pub fn all_on(&mut self) -> Result<(), Error<E>> {
        self.set_mask(0xFF)
    }

    pub fn all_off(&mut self) -> Result<(), Error<E>> {
        self.set_mask(0)
    }

    /// Firmware version byte of the board's MCU.
    pub fn firmware_version(&mut self) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[cmd::READ_FIRMWARE_VER], &mut buf)?;
        Ok(buf[0])
    }

    /// Persists a new I2C address to the board and switches the driver to
    /// it. Takes effect immediately and survives power cycles.
    pub fn change_address(&mut self, new_address: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[cmd::SAVE_I2C_ADDR, new_address])?;
        debug!("relay: address changed {:#04x} -> {:#04x}", self.address, new_address);
        self.address = new_address;
        Ok(())
    }

    /// Releases the bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn channel_bit(&self, channel: u8) -> Result<u8, Error<E>> {
        if channel == 0 || channel > self.channels {
            return Err(Error::InvalidChannel);
        }
        Ok(1 << (channel - 1))
    }

    fn write_mask(&mut self, mask: u8) -> Result<(), Error<E>> {
        self.i2c.write(self.address, &[cmd::CHANNEL_CTRL, mask])?;
        self.state = mask;
        Ok(())
    }
}
