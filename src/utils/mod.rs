//! Common utility functions for the EMG pipeline
//!
//! - Clock abstraction with a mock provider for deterministic tests
//! - ADC to voltage conversion and rounding helpers

pub mod time;
pub mod conversion;

pub use time::{
    current_timestamp_millis,
    system_clock,
    MockTimeProvider,
    SharedClock,
    SystemTimeProvider,
    TimeProvider,
};

pub use conversion::{adc_to_voltage, clamp_to_adc, counts_to_volts, round_to};
