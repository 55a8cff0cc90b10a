//! Integer compensation formulas for the BME680.
//!
//! Direct renditions of the manufacturer's integer reference equations:
//! raw ADC words plus the factory calibration vector in, physical units
//! out. Nothing in here touches the bus, so the whole pipeline is testable
//! with fixed vectors.
//!
//! Intermediates are 64-bit. The reference code uses 32-bit arithmetic and
//! silently relies on values staying in range; widening removes those
//! overflow corners without changing any in-range result.

use super::CalibData;

/// Constants used by the gas resistance calculation, indexed by the
/// sensor-reported `gas_range` (0..=15).
const GAS_RANGE_LOOKUP_1: [i64; 16] = [
    2147483647, 2147483647, 2147483647, 2147483647, 2147483647, 2126008810, 2147483647,
    2130303777, 2147483647, 2147483647, 2143075143, 2136746228, 2147483647, 2126008810,
    2147483647, 2147483647,
];
const GAS_RANGE_LOOKUP_2: [i64; 16] = [
    4096000000, 2048000000, 1024000000, 512000000, 255744255, 127110228, 64000000, 32258064,
    16016016, 8000000, 4000000, 2000000, 1000000, 500000, 250000, 125000,
];

/// Compensated temperature and the `t_fine` carry-over value.
///
/// `t_fine` is a high resolution intermediate that the pressure and
/// humidity formulas reuse to account for temperature dependence.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Temperature {
    pub t_fine: i64,
    /// 1/100 degree Celsius.
    pub centi_celsius: i32,
}

/// Temperature compensation. Input is the 20-bit temperature ADC word.
pub(crate) fn temperature(calib: &CalibData, temp_adc: u32) -> Temperature {
    let var1 = ((temp_adc as i64) >> 3) - ((calib.par_t1 as i64) << 1);
    let var2 = (var1 * calib.par_t2 as i64) >> 11;
    let var3 = ((var1 >> 1) * (var1 >> 1)) >> 12;
    let var3 = (var3 * ((calib.par_t3 as i64) << 4)) >> 14;
    let t_fine = var2 + var3;
    Temperature {
        t_fine,
        centi_celsius: ((t_fine * 5 + 128) >> 8) as i32,
    }
}

/// Pressure compensation in Pascal. Input is the 20-bit pressure ADC word
/// and `t_fine` from [`temperature`].
pub(crate) fn pressure(calib: &CalibData, t_fine: i64, press_adc: u32) -> u32 {
    let var1 = (t_fine >> 1) - 64000;
    let var2 = ((((var1 >> 2) * (var1 >> 2)) >> 11) * calib.par_p6 as i64) >> 2;
    let var2 = var2 + ((var1 * calib.par_p5 as i64) << 1);
    let var2 = (var2 >> 2) + ((calib.par_p4 as i64) << 16);
    let var1 = (((((var1 >> 2) * (var1 >> 2)) >> 13) * ((calib.par_p3 as i64) << 5)) >> 3)
        + ((calib.par_p2 as i64 * var1) >> 1);
    let var1 = var1 >> 18;
    let var1 = ((32768 + var1) * calib.par_p1 as i64) >> 15;

    let pressure = 1048576 - press_adc as i64;
    let pressure = (pressure - (var2 >> 12)) * 3125;
    // The reference code switches the order of shift and divide close to
    // the i32 limit to keep precision; kept for bit-exactness.
    let pressure = if pressure >= 1 << 30 {
        (pressure / var1) << 1
    } else {
        (pressure << 1) / var1
    };

    let var1 = (calib.par_p9 as i64 * (((pressure >> 3) * (pressure >> 3)) >> 13)) >> 12;
    let var2 = ((pressure >> 2) * calib.par_p8 as i64) >> 13;
    let var3 = ((pressure >> 8) * (pressure >> 8) * (pressure >> 8) * calib.par_p10 as i64) >> 17;
    let pressure = pressure + ((var1 + var2 + var3 + ((calib.par_p7 as i64) << 7)) >> 4);
    pressure.clamp(0, u32::MAX as i64) as u32
}

/// Humidity compensation in 1/1000 percent relative humidity, clamped to
/// the physical 0..=100% range. Input is the 16-bit humidity ADC word and
/// `t_fine` from [`temperature`].
pub(crate) fn humidity(calib: &CalibData, t_fine: i64, hum_adc: u16) -> u32 {
    let temp_scaled = (t_fine * 5 + 128) >> 8;
    let var1 = hum_adc as i64
        - calib.par_h1 as i64 * 16
        - (((temp_scaled * calib.par_h3 as i64) / 100) >> 1);
    let var2 = (calib.par_h2 as i64
        * ((temp_scaled * calib.par_h4 as i64) / 100
            + (((temp_scaled * ((temp_scaled * calib.par_h5 as i64) / 100)) >> 6) / 100)
            + (1 << 14)))
        >> 10;
    let var3 = var1 * var2;
    let var4 = (((calib.par_h6 as i64) << 7) + (temp_scaled * calib.par_h7 as i64) / 100) >> 4;
    let var5 = ((var3 >> 14) * (var3 >> 14)) >> 10;
    let var6 = (var4 * var5) >> 1;
    let hum = (((var3 + var6) >> 10) * 1000) >> 12;
    hum.clamp(0, 100_000) as u32
}

/// Gas resistance in Ohm. Inputs are the 10-bit gas ADC word and the
/// sensor-reported range selector.
pub(crate) fn gas_resistance(calib: &CalibData, gas_adc: u16, gas_range: u8) -> u32 {
    let gas_range = (gas_range & 0x0F) as usize;
    let var1 =
        ((1340 + 5 * calib.range_sw_err as i64) * GAS_RANGE_LOOKUP_1[gas_range]) >> 16;
    let var2 = ((gas_adc as i64) << 15) - 16777216 + var1;
    let var3 = (GAS_RANGE_LOOKUP_2[gas_range] * var1) >> 9;
    ((var3 + (var2 >> 1)) / var2) as u32
}

/// Heater set-point encoding: the `res_heat_x` register value that makes
/// the hot plate reach `target_celsius`, given the current ambient
/// temperature. Targets are clamped to the hardware's 200..=400 degree
/// span.
pub(crate) fn heater_resistance(calib: &CalibData, ambient_celsius: i8, target_celsius: u16) -> u8 {
    let target = i32::from(target_celsius.clamp(200, 400));
    let amb = ambient_celsius as i32;

    let var1 = (amb * calib.par_g3 as i32 / 1000) * 256;
    let var2 = (calib.par_g1 as i32 + 784)
        * (((calib.par_g2 as i32 + 154009) * target * 5 / 100 + 3276800) / 10);
    let var3 = var1 + (var2 >> 1);
    let var4 = var3 / (calib.res_heat_range as i32 + 4);
    let var5 = 131 * calib.res_heat_val as i32 + 65536;
    let res_heat_x100 = (var4 / var5 - 250) * 34;
    ((res_heat_x100 + 50) / 100) as u8
}

/// Gas wait time encoding: 6-bit mantissa in milliseconds with a 2-bit
/// x1/x4/x16/x64 multiplier. Durations at or beyond the representable
/// 0xFC0 ms saturate to the all-ones register value.
pub(crate) fn gas_wait(duration_ms: u16) -> u8 {
    if duration_ms >= 0xFC0 {
        return 0xFF;
    }
    let mut mantissa = duration_ms;
    let mut factor = 0u8;
    while mantissa > 0x3F {
        mantissa /= 4;
        factor += 1;
    }
    mantissa as u8 + factor * 64
}
