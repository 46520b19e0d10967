// src/utils/conversion.rs
//! ADC and unit conversion helpers
//!
//! Sensor values arrive as 10-bit ADC counts. Voltages are reported with two
//! decimals, matching what the dashboard displays.

use crate::config::constants::adc;

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Unrounded voltage for an ADC count (or a smoothed count)
pub fn counts_to_volts(counts: f64) -> f64 {
    counts / adc::FULL_SCALE * adc::REFERENCE_VOLTAGE
}

/// Convert a raw ADC value to volts, rounded for display
pub fn adc_to_voltage(value: u16) -> f64 {
    round_to(counts_to_volts(f64::from(value)), adc::VOLTAGE_DECIMALS)
}

/// Clamp an arbitrary signal value into the ADC range
pub fn clamp_to_adc(value: f64) -> u16 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(adc::MAX_VALUE)) as u16
}
