//! Bosch BME680 gas / temperature / humidity / pressure sensor.
//!
//! The BME680 is the one genuinely intricate device in this collection: a
//! measurement is a forced-mode cycle that reads four raw ADC words and
//! runs them through manufacturer compensation formulas parameterized by a
//! per-chip factory calibration vector, and the gas channel additionally
//! needs a heater set-point (resistance code plus wait time) derived from
//! that same vector. The pure math lives in [`calc`]; this module owns the
//! register traffic.
//!
//! Typical use:
//!
//! 1. Build a [`Config`] (or take [`Config::default`]).
//! 2. [`Bme680::init`] probes the chip, soft-resets it, loads calibration
//!    and applies the configuration.
//! 3. [`Bme680::measure`] triggers one forced-mode cycle and returns a
//!    compensated [`Measurement`].

mod calc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, warn};

/// Primary I2C address (SDO low).
pub const PRIMARY_ADDR: u8 = 0x76;
/// Secondary I2C address (SDO high).
pub const SECONDARY_ADDR: u8 = 0x77;

/// Value the chip ID register reads back on a real BME680.
const CHIP_ID: u8 = 0x61;
/// Written to the reset register to trigger a soft reset.
const SOFT_RESET_CMD: u8 = 0xB6;

/// Register addresses, from the Bosch datasheet.
mod regs {
    /// Heater calibration byte.
    pub const RES_HEAT_VAL: u8 = 0x00;
    /// Heater range calibration (bits 5:4).
    pub const RES_HEAT_RANGE: u8 = 0x02;
    /// Range switching error calibration (bits 7:4, signed).
    pub const RANGE_SW_ERR: u8 = 0x04;
    /// `new_data` (bit 7), `measuring` (bit 5) status bits.
    pub const MEAS_STATUS_0: u8 = 0x1D;
    /// Start of the raw data block (pressure MSB).
    pub const PRESS_MSB: u8 = 0x1F;
    /// Heater set-point 0 resistance code.
    pub const RES_HEAT_0: u8 = 0x5A;
    /// Heater set-point 0 wait time.
    pub const GAS_WAIT_0: u8 = 0x64;
    /// `run_gas` (bit 4) and set-point select `nb_conv` (bits 3:0).
    pub const CTRL_GAS_1: u8 = 0x71;
    /// Humidity oversampling (bits 2:0).
    pub const CTRL_HUM: u8 = 0x72;
    /// Temp/pressure oversampling and power mode.
    pub const CTRL_MEAS: u8 = 0x74;
    /// IIR filter coefficient (bits 4:2).
    pub const CONFIG: u8 = 0x75;
    /// First calibration block, 25 bytes.
    pub const COEFF_BLOCK_1: u8 = 0x89;
    /// Chip ID, reads 0x61.
    pub const ID: u8 = 0xD0;
    /// Soft reset on writing 0xB6.
    pub const RESET: u8 = 0xE0;
    /// Second calibration block, 16 bytes.
    pub const COEFF_BLOCK_2: u8 = 0xE1;
}

const COEFF_BLOCK_1_LEN: usize = 25;
const COEFF_BLOCK_2_LEN: usize = 16;
const COEFF_LEN: usize = COEFF_BLOCK_1_LEN + COEFF_BLOCK_2_LEN;
/// Raw data block: pressure, temperature, humidity, gas (0x1F..=0x2B).
const FIELD_LEN: usize = 13;

/// How long [`Bme680::measure`] polls for `new_data` before giving up.
const POLL_INTERVAL_US: u32 = 500;
const POLL_ATTEMPTS: u32 = 100;

/// Errors the driver can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
pub enum Error<E> {
    /// Underlying I2C bus error.
    #[error("i2c bus error")]
    I2c(E),
    /// The chip ID register did not read back the BME680 signature.
    #[error("unexpected chip id {0:#04x}")]
    UnexpectedChipId(u8),
    /// The sensor never raised `new_data` within the polling budget.
    #[error("measurement timed out")]
    Timeout,
    /// Gas data was read but flagged invalid by the sensor.
    #[error("gas measurement invalid")]
    GasInvalid,
    /// The heater did not reach its set-point before the gas measurement.
    #[error("gas heater not stable")]
    HeaterUnstable,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::I2c(e)
    }
}

/// Oversampling setting for the temperature, pressure and humidity ADCs.
///
/// `Skip` disables the channel entirely; its reading comes back as the
/// register default and the compensated value is meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Oversampling {
    Skip = 0b000,
    X1 = 0b001,
    #[default]
    X2 = 0b010,
    X4 = 0b011,
    X8 = 0b100,
    X16 = 0b101,
}

/// IIR filter coefficient applied to temperature and pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum IirFilter {
    Off = 0b000,
    Coeff1 = 0b001,
    #[default]
    Coeff3 = 0b010,
    Coeff7 = 0b011,
    Coeff15 = 0b100,
    Coeff31 = 0b101,
    Coeff63 = 0b110,
    Coeff127 = 0b111,
}

/// Gas heater set-point: hot plate target temperature and the time the
/// plate is given to reach it before the gas ADC samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaterProfile {
    /// Target plate temperature in whole degrees Celsius, clamped by the
    /// hardware to 200..=400.
    pub target_celsius: u16,
    /// Heating time in milliseconds before the gas measurement; values at
    /// or above 0xFC0 saturate the register encoding.
    pub duration_ms: u16,
}

impl Default for HeaterProfile {
    fn default() -> Self {
        Self {
            target_celsius: 300,
            duration_ms: 100,
        }
    }
}

/// Measurement configuration, applied once during [`Bme680::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub temperature: Oversampling,
    pub pressure: Oversampling,
    pub humidity: Oversampling,
    pub filter: IirFilter,
    /// `None` leaves the heater off; the gas channel then reports `None`.
    pub heater: Option<HeaterProfile>,
    /// Ambient temperature estimate used for the heater set-point math.
    /// A rough value is fine; refresh it with
    /// [`Bme680::set_ambient_temperature`] once real readings exist.
    pub ambient_celsius: i8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temperature: Oversampling::X2,
            pressure: Oversampling::X4,
            humidity: Oversampling::X2,
            filter: IirFilter::default(),
            heater: Some(HeaterProfile::default()),
            ambient_celsius: 25,
        }
    }
}

/// Factory calibration vector, fused per chip and read during init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibData {
    pub par_t1: u16,
    pub par_t2: i16,
    pub par_t3: i8,
    pub par_p1: u16,
    pub par_p2: i16,
    pub par_p3: i8,
    pub par_p4: i16,
    pub par_p5: i16,
    pub par_p6: i8,
    pub par_p7: i8,
    pub par_p8: i16,
    pub par_p9: i16,
    pub par_p10: u8,
    pub par_h1: u16,
    pub par_h2: u16,
    pub par_h3: i8,
    pub par_h4: i8,
    pub par_h5: i8,
    pub par_h6: u8,
    pub par_h7: i8,
    pub par_g1: i8,
    pub par_g2: i16,
    pub par_g3: i8,
    pub res_heat_range: u8,
    pub res_heat_val: i8,
    pub range_sw_err: i8,
}

impl CalibData {
    /// Decodes the two coefficient blocks (concatenated, 0x89 block first)
    /// plus the three standalone heater calibration registers.
    ///
    /// The byte-to-parameter mapping is the datasheet's; several
    /// parameters straddle the two blocks or share nibbles of one byte.
    fn from_registers(
        coeff: &[u8; COEFF_LEN],
        res_heat_val: u8,
        res_heat_range: u8,
        range_sw_err: u8,
    ) -> Self {
        let word = |lsb: usize, msb: usize| u16::from(coeff[lsb]) | u16::from(coeff[msb]) << 8;
        Self {
            par_t1: word(33, 34),
            par_t2: word(1, 2) as i16,
            par_t3: coeff[3] as i8,
            par_p1: word(5, 6),
            par_p2: word(7, 8) as i16,
            par_p3: coeff[9] as i8,
            par_p4: word(11, 12) as i16,
            par_p5: word(13, 14) as i16,
            par_p6: coeff[16] as i8,
            par_p7: coeff[15] as i8,
            par_p8: word(19, 20) as i16,
            par_p9: word(21, 22) as i16,
            par_p10: coeff[23],
            // H1 and H2 share the nibbles of byte 26.
            par_h1: u16::from(coeff[26] & 0x0F) | u16::from(coeff[27]) << 4,
            par_h2: u16::from(coeff[26] >> 4) | u16::from(coeff[25]) << 4,
            par_h3: coeff[28] as i8,
            par_h4: coeff[29] as i8,
            par_h5: coeff[30] as i8,
            par_h6: coeff[31],
            par_h7: coeff[32] as i8,
            par_g1: coeff[37] as i8,
            par_g2: word(35, 36) as i16,
            par_g3: coeff[38] as i8,
            res_heat_range: (res_heat_range & 0x30) >> 4,
            res_heat_val: res_heat_val as i8,
            range_sw_err: (range_sw_err as i8) >> 4,
        }
    }
}

/// Raw ADC words and gas status bits from one burst read of the data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawReading {
    press_adc: u32,
    temp_adc: u32,
    hum_adc: u16,
    gas_adc: u16,
    gas_range: u8,
    gas_valid: bool,
    heat_stable: bool,
}

impl RawReading {
    /// Reconstructs the 20-bit pressure/temperature, 16-bit humidity and
    /// 10-bit gas words from the 0x1F..=0x2B register block.
    fn parse(field: &[u8; FIELD_LEN]) -> Self {
        Self {
            press_adc: u32::from(field[0]) << 12
                | u32::from(field[1]) << 4
                | u32::from(field[2]) >> 4,
            temp_adc: u32::from(field[3]) << 12
                | u32::from(field[4]) << 4
                | u32::from(field[5]) >> 4,
            hum_adc: u16::from(field[6]) << 8 | u16::from(field[7]),
            gas_adc: u16::from(field[11]) << 2 | u16::from(field[12]) >> 6,
            gas_range: field[12] & 0x0F,
            gas_valid: field[12] & 0x20 != 0,
            heat_stable: field[12] & 0x10 != 0,
        }
    }
}

/// One compensated measurement, in scaled integer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    /// 1/100 degree Celsius; 2231 is 22.31 C.
    pub temperature_centi_celsius: i32,
    /// Pascal; 101325 is 1013.25 hPa.
    pub pressure_pa: u32,
    /// 1/1000 percent relative humidity; 45624 is 45.624 %rH.
    pub humidity_milli_percent: u32,
    /// Ohm. `None` when the heater is disabled in the [`Config`]. Higher
    /// resistance generally means cleaner air.
    pub gas_resistance_ohm: Option<u32>,
}

/// BME680 driver. Owns the bus handle; see the module docs for the
/// init/measure flow.
#[derive(Debug)]
pub struct Bme680<I2C> {
    i2c: I2C,
    address: u8,
    config: Config,
    calib: CalibData,
}

impl<I2C, E> Bme680<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Probes, soft-resets and configures the sensor, and loads its
    /// calibration vector. On success the driver is ready to
    /// [`measure`](Self::measure).
    pub fn init(
        i2c: I2C,
        address: u8,
        config: Config,
        delay: &mut impl DelayNs,
    ) -> Result<Self, Error<E>> {
        let mut driver = Self {
            i2c,
            address,
            config,
            calib: CalibData::default(),
        };

        let id = driver.read_reg(regs::ID)?;
        if id != CHIP_ID {
            return Err(Error::UnexpectedChipId(id));
        }

        driver.write_reg(regs::RESET, SOFT_RESET_CMD)?;
        delay.delay_ms(5);

        driver.calib = driver.read_calibration()?;
        debug!("bme680: chip found at {:#04x}, calibration loaded", address);

        driver.apply_config()?;
        Ok(driver)
    }

    /// Runs one forced-mode measurement cycle and compensates the result.
    ///
    /// Blocks for the heating time (when the heater is enabled) plus
    /// however long the sensor takes to raise `new_data`, bounded by a
    /// 50 ms polling budget.
    pub fn measure(&mut self, delay: &mut impl DelayNs) -> Result<Measurement, Error<E>> {
        self.trigger_forced_mode()?;
        if let Some(heater) = self.config.heater {
            delay.delay_ms(u32::from(heater.duration_ms.min(0xFC0)));
        }

        let raw = self.read_raw(delay)?;
        let temp = calc::temperature(&self.calib, raw.temp_adc);
        let pressure = calc::pressure(&self.calib, temp.t_fine, raw.press_adc);
        let humidity = calc::humidity(&self.calib, temp.t_fine, raw.hum_adc);

        let gas = if self.config.heater.is_some() {
            if !raw.gas_valid {
                warn!("bme680: gas reading flagged invalid");
                return Err(Error::GasInvalid);
            }
            if !raw.heat_stable {
                warn!("bme680: heater did not stabilize");
                return Err(Error::HeaterUnstable);
            }
            Some(calc::gas_resistance(&self.calib, raw.gas_adc, raw.gas_range))
        } else {
            None
        };

        Ok(Measurement {
            temperature_centi_celsius: temp.centi_celsius,
            pressure_pa: pressure,
            humidity_milli_percent: humidity,
            gas_resistance_ohm: gas,
        })
    }

    /// Updates the ambient temperature estimate and re-encodes the heater
    /// set-point with it.
    ///
    /// Call this occasionally with the sensor's own temperature reading;
    /// small corrections keep the plate temperature, and with it the gas
    /// baseline, steady across seasons.
    pub fn set_ambient_temperature(&mut self, celsius: i8) -> Result<(), Error<E>> {
        self.config.ambient_celsius = celsius;
        if let Some(heater) = self.config.heater {
            let res_heat = calc::heater_resistance(&self.calib, celsius, heater.target_celsius);
            self.write_reg(regs::RES_HEAT_0, res_heat)?;
        }
        Ok(())
    }

    /// The calibration vector read during init.
    pub fn calibration(&self) -> &CalibData {
        &self.calib
    }

    /// Releases the bus handle.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_calibration(&mut self) -> Result<CalibData, Error<E>> {
        let mut coeff = [0u8; COEFF_LEN];
        self.i2c.write_read(
            self.address,
            &[regs::COEFF_BLOCK_1],
            &mut coeff[..COEFF_BLOCK_1_LEN],
        )?;
        self.i2c.write_read(
            self.address,
            &[regs::COEFF_BLOCK_2],
            &mut coeff[COEFF_BLOCK_1_LEN..],
        )?;

        let res_heat_val = self.read_reg(regs::RES_HEAT_VAL)?;
        let res_heat_range = self.read_reg(regs::RES_HEAT_RANGE)?;
        let range_sw_err = self.read_reg(regs::RANGE_SW_ERR)?;
        Ok(CalibData::from_registers(
            &coeff,
            res_heat_val,
            res_heat_range,
            range_sw_err,
        ))
    }

    /// Writes oversampling, filter and heater configuration. Power mode
    /// stays in sleep; [`measure`](Self::measure) switches to forced mode
    /// per cycle.
    fn apply_config(&mut self) -> Result<(), Error<E>> {
        self.update_reg(regs::CTRL_HUM, 0b0000_0111, self.config.humidity as u8)?;
        self.update_reg(
            regs::CTRL_MEAS,
            0b1111_1100,
            (self.config.temperature as u8) << 5 | (self.config.pressure as u8) << 2,
        )?;
        self.update_reg(regs::CONFIG, 0b0001_1100, (self.config.filter as u8) << 2)?;

        match self.config.heater {
            Some(heater) => {
                self.write_reg(regs::GAS_WAIT_0, calc::gas_wait(heater.duration_ms))?;
                let res_heat = calc::heater_resistance(
                    &self.calib,
                    self.config.ambient_celsius,
                    heater.target_celsius,
                );
                self.write_reg(regs::RES_HEAT_0, res_heat)?;
                // run_gas on, nb_conv selects set-point 0.
                self.update_reg(regs::CTRL_GAS_1, 0b0001_1111, 0b0001_0000)?;
            }
            None => self.update_reg(regs::CTRL_GAS_1, 0b0001_0000, 0)?,
        }
        Ok(())
    }

    fn trigger_forced_mode(&mut self) -> Result<(), Error<E>> {
        self.update_reg(regs::CTRL_MEAS, 0b0000_0011, 0b01)
    }

    /// Polls `new_data` with a bounded budget, then burst-reads the field.
    fn read_raw(&mut self, delay: &mut impl DelayNs) -> Result<RawReading, Error<E>> {
        let mut attempts = POLL_ATTEMPTS;
        loop {
            let status = self.read_reg(regs::MEAS_STATUS_0)?;
            if status & 0x80 != 0 {
                break;
            }
            attempts -= 1;
            if attempts == 0 {
                return Err(Error::Timeout);
            }
            delay.delay_us(POLL_INTERVAL_US);
        }

        let mut field = [0u8; FIELD_LEN];
        self.i2c
            .write_read(self.address, &[regs::PRESS_MSB], &mut field)?;
        Ok(RawReading::parse(&field))
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

    /// Read-modify-write keeping the bits outside `mask` untouched.
    fn update_reg(&mut self, reg: u8, mask: u8, value: u8) -> Result<(), Error<E>> {
        let current = self.read_reg(reg)?;
        self.write_reg(reg, (current & !mask) | (value & mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    #[test]
    fn raw_reading_reconstructs_adc_words() {
        let field: [u8; FIELD_LEN] = [
            0x65, 0x57, 0xC0, // pressure: 0x6557C
            0x77, 0x74, 0x60, // temperature: 0x77 0x74 0x6 -> 489_286
            0x4E, 0xC3, // humidity: 0x4EC3 -> 20163
            0x00, 0x00, 0x00, // unused
            0x96, 0x34, // gas: 0x96<<2 | 0x34>>6 = 600, range 4, valid+stable
        ];
        let raw = RawReading::parse(&field);
        assert_eq!(raw.press_adc, 0x6557C);
        assert_eq!(raw.temp_adc, 489_286);
        assert_eq!(raw.hum_adc, 20163);
        assert_eq!(raw.gas_adc, 600);
        assert_eq!(raw.gas_range, 4);
        assert!(raw.gas_valid);
        assert!(raw.heat_stable);
    }

    #[test]
    fn raw_reading_gas_status_bits() {
        let mut field = [0u8; FIELD_LEN];
        field[12] = 0x20; // valid, not stable
        let raw = RawReading::parse(&field);
        assert!(raw.gas_valid);
        assert!(!raw.heat_stable);
    }

    #[test]
    fn calibration_decoding_handles_split_parameters() {
        let mut coeff = [0u8; COEFF_LEN];
        // par_t1 = 26126 = 0x660E at bytes 33/34
        coeff[33] = 0x0E;
        coeff[34] = 0x66;
        // par_t2 = 26263 = 0x6697 at bytes 1/2
        coeff[1] = 0x97;
        coeff[2] = 0x66;
        // par_p2 = -10239 = 0xD801 at bytes 7/8
        coeff[7] = 0x01;
        coeff[8] = 0xD8;
        // par_h1/par_h2 share byte 26: h1 = 0x2C1 (705), h2 = 0x3FD (1021)
        coeff[27] = 0x2C;
        coeff[26] = 0xD1;
        coeff[25] = 0x3F;

        let calib = CalibData::from_registers(&coeff, 47, 0b0001_0000, 0x10);
        assert_eq!(calib.par_t1, 26126);
        assert_eq!(calib.par_t2, 26263);
        assert_eq!(calib.par_p2, -10239);
        assert_eq!(calib.par_h1, 705);
        assert_eq!(calib.par_h2, 1021);
        assert_eq!(calib.res_heat_range, 1);
        assert_eq!(calib.res_heat_val, 47);
        assert_eq!(calib.range_sw_err, 1);
    }

    #[test]
    fn range_sw_err_is_sign_extended() {
        let coeff = [0u8; COEFF_LEN];
        let calib = CalibData::from_registers(&coeff, 0, 0, 0xF0);
        assert_eq!(calib.range_sw_err, -1);
    }

    #[test]
    fn init_rejects_wrong_chip_id() {
        let expectations =
            [Transaction::write_read(PRIMARY_ADDR, vec![regs::ID], vec![0x58])];
        let i2c = I2cMock::new(&expectations);
        // The driver consumes the bus, so keep a clone to check on.
        let mut i2c_clone = i2c.clone();
        let mut delay = NoopDelay::new();

        let err = Bme680::init(i2c, PRIMARY_ADDR, Config::default(), &mut delay)
            .err()
            .unwrap();
        assert_eq!(err, Error::UnexpectedChipId(0x58));
        i2c_clone.done();
    }

    #[test]
    fn init_and_forced_measurement() {
        // Calibration register images matching the vector the calc tests
        // use, so the expected outputs are the same known-good numbers.
        let coeff1 = vec![
            0x00, 0x97, 0x66, 0x03, 0x00, 0xAE, 0x8D, 0x01, 0xD8, 0x58, 0x00, 0xB8, 0x1D,
            0x81, 0xFF, 0x1A, 0x1E, 0x00, 0x00, 0x67, 0xFE, 0xE5, 0xF5, 0x1E, 0x00,
        ];
        let coeff2 = vec![
            0x3F, 0xD1, 0x2C, 0x00, 0x2D, 0x14, 0x78, 0x9C, 0x0E, 0x66, 0xBE, 0xB1, 0xE3,
            0x12, 0x00, 0x00,
        ];
        let expectations = [
            Transaction::write_read(PRIMARY_ADDR, vec![regs::ID], vec![CHIP_ID]),
            Transaction::write(PRIMARY_ADDR, vec![regs::RESET, SOFT_RESET_CMD]),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::COEFF_BLOCK_1], coeff1),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::COEFF_BLOCK_2], coeff2),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::RES_HEAT_VAL], vec![47]),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::RES_HEAT_RANGE], vec![0x10]),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::RANGE_SW_ERR], vec![0x00]),
            // Oversampling, filter, heater configuration.
            Transaction::write_read(PRIMARY_ADDR, vec![regs::CTRL_HUM], vec![0x00]),
            Transaction::write(PRIMARY_ADDR, vec![regs::CTRL_HUM, 0x02]),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::CTRL_MEAS], vec![0x00]),
            Transaction::write(PRIMARY_ADDR, vec![regs::CTRL_MEAS, 0x4C]),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::CONFIG], vec![0x00]),
            Transaction::write(PRIMARY_ADDR, vec![regs::CONFIG, 0x08]),
            Transaction::write(PRIMARY_ADDR, vec![regs::GAS_WAIT_0, 0x59]),
            Transaction::write(PRIMARY_ADDR, vec![regs::RES_HEAT_0, 104]),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::CTRL_GAS_1], vec![0x00]),
            Transaction::write(PRIMARY_ADDR, vec![regs::CTRL_GAS_1, 0x10]),
            // measure(): forced mode, data ready on the first poll.
            Transaction::write_read(PRIMARY_ADDR, vec![regs::CTRL_MEAS], vec![0x4C]),
            Transaction::write(PRIMARY_ADDR, vec![regs::CTRL_MEAS, 0x4D]),
            Transaction::write_read(PRIMARY_ADDR, vec![regs::MEAS_STATUS_0], vec![0x80]),
            Transaction::write_read(
                PRIMARY_ADDR,
                vec![regs::PRESS_MSB],
                vec![
                    0x65, 0x5A, 0xC0, 0x77, 0x74, 0x60, 0x4E, 0xC3, 0x00, 0x00, 0x00, 0x96,
                    0x34,
                ],
            ),
        ];
        let i2c = I2cMock::new(&expectations);
        let mut delay = NoopDelay::new();

        let mut sensor =
            Bme680::init(i2c, PRIMARY_ADDR, Config::default(), &mut delay).unwrap();
        assert_eq!(sensor.calibration().par_t1, 26126);
        assert_eq!(sensor.calibration().par_h2, 1021);

        let m = sensor.measure(&mut delay).unwrap();
        assert_eq!(m.temperature_centi_celsius, 2231);
        assert_eq!(m.pressure_pa, 87929);
        assert_eq!(m.humidity_milli_percent, 45624);
        assert_eq!(m.gas_resistance_ohm, Some(468719));

        sensor.release().done();
    }
}
