// src/config/mod.rs
//! Pipeline configuration
//!
//! Every field has a serde default pointing at a named constant, so a
//! partial TOML file (or none at all) yields a usable configuration.

pub mod alerts;
pub mod constants;
pub mod loader;

pub use alerts::{AlertThresholds, ThresholdZone, UserType};
pub use loader::{ConfigError, ConfigLoader};

use crate::hal::simulator::SimulatorConfig;
use serde::{Deserialize, Serialize};

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Source cadences
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Per-muscle processor settings
    #[serde(default)]
    pub processor: ProcessorConfig,
    /// Calibration wizard settings
    #[serde(default)]
    pub calibration: CalibrationConfig,
    /// Synthetic source settings
    #[serde(default)]
    pub simulator: SimulatorConfig,
    /// Alert settings
    #[serde(default)]
    pub alerts: AlertConfig,
}

/// Source cadences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Monitoring session tick
    #[serde(default = "defaults::session_interval_ms")]
    pub session_interval_ms: u64,

    /// Calibration live readout tick
    #[serde(default = "defaults::calibration_interval_ms")]
    pub calibration_interval_ms: u64,
}

/// Per-muscle processor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Readings kept in history
    #[serde(default = "defaults::history_capacity")]
    pub history_capacity: usize,

    /// Smoothing applied before voltage conversion
    #[serde(default)]
    pub smoothing: SmoothingConfig,
}

/// Smoothing method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingKind {
    /// Simple moving average over `window` samples
    #[default]
    Moving,
    /// Exponential moving average with factor `alpha`
    Exponential,
    /// Raw values passed through unchanged
    Passthrough,
}

/// Smoothing applied before voltage conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Smoothing method
    #[serde(default)]
    pub method: SmoothingKind,

    /// Moving-average window in samples
    #[serde(default = "defaults::smoothing_window")]
    pub window: usize,

    /// Exponential factor in `(0, 1]`
    #[serde(default = "defaults::smoothing_alpha")]
    pub alpha: f64,
}

/// Calibration wizard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Hold window after each recording
    #[serde(default = "defaults::hold_ms")]
    pub hold_ms: u64,

    /// Catalog muscles pre-registered for the wizard
    #[serde(default = "defaults::wizard_muscles")]
    pub wizard_muscles: usize,
}

/// Alert settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Kind of user the alert levels are tuned for
    #[serde(default)]
    pub user_type: UserType,
}

impl AlertConfig {
    /// Alert levels for the configured user type
    pub fn thresholds(&self) -> AlertThresholds {
        self.user_type.thresholds()
    }
}

mod defaults {
    use crate::config::constants::*;

    pub fn session_interval_ms() -> u64 { sampling::SESSION_INTERVAL_MS }
    pub fn calibration_interval_ms() -> u64 { sampling::CALIBRATION_INTERVAL_MS }

    pub fn history_capacity() -> usize { processor::DETAILED_HISTORY }
    pub fn smoothing_window() -> usize { processor::DEFAULT_SMOOTHING_WINDOW }
    pub fn smoothing_alpha() -> f64 { 0.3 }

    pub fn hold_ms() -> u64 { calibration::RECORDING_HOLD_MS }
    pub fn wizard_muscles() -> usize { calibration::DEFAULT_WIZARD_MUSCLES }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            session_interval_ms: defaults::session_interval_ms(),
            calibration_interval_ms: defaults::calibration_interval_ms(),
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            history_capacity: defaults::history_capacity(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Settings for the dashboard's short live view
    pub fn live_view() -> Self {
        Self {
            history_capacity: constants::processor::LIVE_VIEW_HISTORY,
            ..Self::default()
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            method: SmoothingKind::default(),
            window: defaults::smoothing_window(),
            alpha: defaults::smoothing_alpha(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            hold_ms: defaults::hold_ms(),
            wizard_muscles: defaults::wizard_muscles(),
        }
    }
}

impl PipelineConfig {
    /// Check cross-field constraints. Returns every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.sampling.session_interval_ms == 0 {
            errors.push("sampling.session_interval_ms must be positive".to_string());
        }
        if self.sampling.calibration_interval_ms == 0 {
            errors.push("sampling.calibration_interval_ms must be positive".to_string());
        }

        if self.processor.history_capacity == 0 {
            errors.push("processor.history_capacity must be positive".to_string());
        }
        let smoothing = &self.processor.smoothing;
        if smoothing.window == 0 || smoothing.window > constants::processor::MAX_SMOOTHING_WINDOW {
            errors.push(format!(
                "processor.smoothing.window must be within 1..={}",
                constants::processor::MAX_SMOOTHING_WINDOW
            ));
        }
        if !(smoothing.alpha > 0.0 && smoothing.alpha <= 1.0) {
            errors.push("processor.smoothing.alpha must be within (0, 1]".to_string());
        }

        if self.calibration.wizard_muscles > crate::calibration::CATALOG.len() {
            errors.push(format!(
                "calibration.wizard_muscles cannot exceed {}",
                crate::calibration::CATALOG.len()
            ));
        }

        if let Err(e) = self.simulator.validate() {
            errors.push(format!("simulator: {e}"));
        }
        if self.simulator.seed > i64::MAX as u64 {
            errors.push("simulator.seed must fit in a signed 64-bit integer".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
