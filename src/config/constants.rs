// src/config/constants.rs
//! Pipeline-wide constants. Defaults in the config structs point here.

/// ADC and voltage conversion constants
pub mod adc {
    /// Largest raw value a 10-bit sensor ADC can report
    pub const MAX_VALUE: u16 = 1023;
    /// Full-scale divisor used for voltage conversion
    pub const FULL_SCALE: f64 = 1024.0;
    /// Sensor reference voltage
    pub const REFERENCE_VOLTAGE: f64 = 5.0;
    /// Decimal places kept on reported voltages
    pub const VOLTAGE_DECIMALS: u32 = 2;
}

/// Sampling cadence constants
pub mod sampling {
    /// Tick used while accumulating session statistics
    pub const SESSION_INTERVAL_MS: u64 = 500;
    /// Tick used for the calibration live readout
    pub const CALIBRATION_INTERVAL_MS: u64 = 100;
}

/// Sample processor constants
pub mod processor {
    /// History kept by the dashboard live view
    pub const LIVE_VIEW_HISTORY: usize = 20;
    /// History kept by the detailed monitor
    pub const DETAILED_HISTORY: usize = 50;
    /// Moving-average window in samples
    pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;
    /// Largest accepted moving-average window
    pub const MAX_SMOOTHING_WINDOW: usize = 256;

    /// Uncalibrated band edges, in volts
    pub const HIGH_ACTIVATION_VOLTS: f64 = 3.0;
    /// Moderate band starts above this voltage
    pub const MODERATE_ACTIVATION_VOLTS: f64 = 1.5;
}

/// Calibration constants
pub mod calibration {
    /// Length of the hold window for a recording step
    pub const RECORDING_HOLD_MS: u64 = 2000;

    /// Fraction of the relaxed..flexed range where `moderate` begins
    pub const MODERATE_FRACTION: f64 = 0.3;
    /// Fraction of the relaxed..flexed range where `active` begins
    pub const ACTIVE_FRACTION: f64 = 0.7;
    /// Multiple of the flexed baseline above which a reading counts as fatigue
    pub const FATIGUE_FACTOR: f64 = 1.2;

    /// Number of catalog muscles walked by the default wizard
    pub const DEFAULT_WIZARD_MUSCLES: usize = 6;
}

/// Synthetic source constants
pub mod simulator {
    /// Relaxed calibration level, raw ADC
    pub const RELAXED_BASE: f64 = 200.0;
    /// Flexed calibration level
    pub const FLEXED_BASE: f64 = 600.0;
    /// Dashboard live-view level
    pub const DASHBOARD_BASE: f64 = 500.0;
    /// Monitoring session level
    pub const SESSION_BASE: f64 = 400.0;

    /// Calibration noise band width
    pub const CALIBRATION_NOISE_SPAN: f64 = 100.0;
    /// Dashboard noise band
    pub const DASHBOARD_NOISE_SPAN: f64 = 50.0;
    /// Session noise band
    pub const SESSION_NOISE_SPAN: f64 = 100.0;

    /// Dashboard wave amplitude
    pub const DASHBOARD_WAVE_AMPLITUDE: f64 = 100.0;
    /// Dashboard wave period, divides elapsed ms inside `sin`
    pub const DASHBOARD_WAVE_PERIOD_MS: f64 = 1000.0;
    /// Session wave amplitude
    pub const SESSION_WAVE_AMPLITUDE: f64 = 150.0;
    /// Session wave period divisor
    pub const SESSION_WAVE_PERIOD_MS: f64 = 2000.0;
    /// Extra wave added while recording
    pub const SESSION_BOOST_AMPLITUDE: f64 = 200.0;
    /// Boost wave period divisor
    pub const SESSION_BOOST_PERIOD_MS: f64 = 1000.0;

    /// Seed used when none is configured
    pub const DEFAULT_SEED: u64 = 0x454D_4701;
}

/// Alert thresholds per user type, in raw ADC units
pub mod alerts {
    /// (fatigue, optimal, recovery)
    pub const ATHLETE: (u16, u16, u16) = (800, 600, 200);
    /// (fatigue, optimal, recovery)
    pub const PATIENT: (u16, u16, u16) = (600, 400, 150);
    /// (fatigue, optimal, recovery)
    pub const ENTHUSIAST: (u16, u16, u16) = (700, 500, 175);
}

/// Configuration file discovery
pub mod paths {
    /// Default configuration file name
    pub const DEFAULT_CONFIG_FILE: &str = "emg-pipeline.toml";
    /// Optional per-user overrides, loaded after the default file
    pub const USER_CONFIG_FILE: &str = "emg-pipeline.local.toml";
    /// Prefix of environment overrides
    pub const ENV_PREFIX: &str = "EMG";
    /// Separates section and field in variable names
    pub const ENV_SEPARATOR: &str = "__";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_fractions_are_ordered() {
        assert!(calibration::MODERATE_FRACTION < calibration::ACTIVE_FRACTION);
        assert!(calibration::FATIGUE_FACTOR > 1.0);
    }

    #[test]
    fn test_alert_levels_are_ordered() {
        for (fatigue, optimal, recovery) in [alerts::ATHLETE, alerts::PATIENT, alerts::ENTHUSIAST] {
            assert!(fatigue > optimal);
            assert!(optimal > recovery);
            assert!(fatigue <= adc::MAX_VALUE);
        }
    }

    #[test]
    fn test_history_sizes() {
        assert!(processor::LIVE_VIEW_HISTORY < processor::DETAILED_HISTORY);
        assert!(processor::DEFAULT_SMOOTHING_WINDOW <= processor::MAX_SMOOTHING_WINDOW);
    }
}
