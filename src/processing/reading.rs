// src/processing/reading.rs
//! Readings produced by the sample processor

use crate::calibration::ActivationStatus;
use crate::config::constants::processor::{HIGH_ACTIVATION_VOLTS, MODERATE_ACTIVATION_VOLTS};
use serde::{Deserialize, Serialize};

/// Activation band used when a muscle has no calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationLevel {
    /// At or below 1.5 V
    Low,
    /// Above 1.5 V, up to 3.0 V
    Moderate,
    /// Above 3.0 V
    High,
}

impl ActivationLevel {
    /// Classify a smoothed voltage
    pub fn from_volts(volts: f64) -> Self {
        if volts > HIGH_ACTIVATION_VOLTS {
            ActivationLevel::High
        } else if volts > MODERATE_ACTIVATION_VOLTS {
            ActivationLevel::Moderate
        } else {
            ActivationLevel::Low
        }
    }
}

/// Classification attached to a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Voltage band, no baselines available
    Uncalibrated(ActivationLevel),
    /// Band relative to the muscle's baselines
    Calibrated(ActivationStatus),
}

impl Activation {
    /// Classified against baselines
    pub fn is_calibrated(&self) -> bool {
        matches!(self, Activation::Calibrated(_))
    }
}

/// One processed sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Raw ADC value
    pub raw_value: u16,
    /// Volts, two decimals
    pub voltage: f64,
    /// Smoothed signal in volts, two decimals
    pub smoothed_value: f64,
    /// Activation band of the smoothed value
    pub activation: Activation,
}
