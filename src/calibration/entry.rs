// src/calibration/entry.rs
//! Calibration entries, wizard steps and activation bands

use crate::calibration::muscles::{MuscleId, Side};
use crate::config::constants::calibration::{ACTIVE_FRACTION, FATIGUE_FACTOR, MODERATE_FRACTION};
use serde::{Deserialize, Serialize};

/// Step of the guided calibration procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationStep {
    /// Sensor being placed; nothing can be recorded
    #[default]
    Placement,
    /// Waiting for the relaxed baseline
    Relaxed,
    /// Waiting for the flexed baseline
    Flexed,
    /// Both baselines recorded
    Complete,
}

/// Calibrated activation status of a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    /// Below the moderate threshold
    Relaxed,
    /// Between the moderate and active thresholds
    Moderate,
    /// Above the active threshold, up to the fatigue level
    Active,
    /// Above the fatigue level
    Fatigue,
}

/// Baseline pair for one muscle/side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// Muscle/side this entry belongs to
    pub muscle: MuscleId,
    /// Side derived from the muscle id
    pub side: Side,
    /// Relaxed baseline, raw ADC
    pub relaxed_value: Option<u16>,
    /// Flexed baseline, raw ADC
    pub flexed_value: Option<u16>,
    /// Both baselines recorded and valid
    pub calibrated: bool,
    /// Current wizard step
    pub step: CalibrationStep,
}

impl CalibrationEntry {
    /// Uncalibrated entry in `Placement`
    pub fn new(muscle: MuscleId) -> Self {
        Self {
            side: muscle.side(),
            muscle,
            relaxed_value: None,
            flexed_value: None,
            calibrated: false,
            step: CalibrationStep::Placement,
        }
    }

    /// Band thresholds, once both baselines are recorded
    pub fn bands(&self) -> Option<ActivationBands> {
        match (self.calibrated, self.relaxed_value, self.flexed_value) {
            (true, Some(relaxed), Some(flexed)) => Some(ActivationBands::new(relaxed, flexed)),
            _ => None,
        }
    }
}

/// Thresholds derived from a relaxed/flexed pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationBands {
    /// Above this: moderate
    pub moderate: f64,
    /// Above this: active
    pub active: f64,
    /// Above this: fatigue
    pub fatigue: f64,
}

impl ActivationBands {
    /// Bands for a relaxed/flexed pair
    pub fn new(relaxed: u16, flexed: u16) -> Self {
        let relaxed = f64::from(relaxed);
        let flexed = f64::from(flexed);
        let range = flexed - relaxed;

        Self {
            moderate: relaxed + MODERATE_FRACTION * range,
            active: relaxed + ACTIVE_FRACTION * range,
            fatigue: flexed * FATIGUE_FACTOR,
        }
    }

    /// Bands are exclusive lower bounds: a value exactly on a threshold
    /// stays in the band below it.
    pub fn classify(&self, value: f64) -> ActivationStatus {
        if value > self.fatigue {
            ActivationStatus::Fatigue
        } else if value > self.active {
            ActivationStatus::Active
        } else if value > self.moderate {
            ActivationStatus::Moderate
        } else {
            ActivationStatus::Relaxed
        }
    }
}
