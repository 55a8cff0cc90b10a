#![no_std]

//! Drivers for I2C-attached sensors and actuators.
//!
//! Every driver in this crate is independent and generic over the blocking
//! [`embedded_hal::i2c::I2c`] trait (plus [`embedded_hal::delay::DelayNs`]
//! where the device needs conversion waits), so the same code runs against
//! `linux-embedded-hal` on a Raspberry Pi or against any MCU HAL.
//!
//! Each device lives behind a cargo feature of the same name; all are
//! enabled by default. Reading types derive `serde::Serialize` /
//! `serde::Deserialize` when the `serde` feature is on, so measurements can
//! be fed straight into whatever CSV/JSON writer the application uses.
//!
//! | Module | Device | What it is |
//! |---|---|---|
//! | [`bme680`] | Bosch BME680 | gas / temperature / humidity / pressure |
//! | [`ads1115`] | TI ADS1115 | 16-bit 4-channel delta-sigma ADC |
//! | [`ds3231`] | Maxim DS3231 | temperature-compensated real-time clock |
//! | [`pca9685`] | NXP PCA9685 | 16-channel 12-bit PWM (servo/motor) |
//! | [`gps`] | u-blox (DDC) | GPS receiver on the I2C bus, NMEA output |
//! | [`relay`] | Seeed multi-channel relay | relay board behind an MCU |

#[cfg(test)]
#[macro_use]
extern crate std;

#[cfg(feature = "ads1115")]
pub mod ads1115;
#[cfg(feature = "bme680")]
pub mod bme680;
#[cfg(feature = "ds3231")]
pub mod ds3231;
#[cfg(feature = "gps")]
pub mod gps;
#[cfg(feature = "pca9685")]
pub mod pca9685;
#[cfg(feature = "relay")]
pub mod relay;
