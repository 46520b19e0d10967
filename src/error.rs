// src/error.rs
//! Unified error type for the EMG pipeline
//!
//! Every fallible operation in the crate returns [`PipelineResult`]. Module
//! level errors (configuration, simulator) convert into [`PipelineError`] so
//! callers can propagate them with `?`. Nothing here is fatal: the worst
//! outcome is a muscle left uncalibrated or a session that needs a restart.

use crate::calibration::CalibrationStep;
use crate::config::ConfigError;
use crate::hal::simulator::SimulatorError;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors surfaced by the sample source, calibration store and processor
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Classification requested for a muscle without a completed calibration
    #[error("muscle '{muscle}' is not calibrated")]
    NotCalibrated {
        /// Muscle the classification was for
        muscle: String,
    },

    /// Flexed baseline does not exceed the relaxed baseline
    #[error("invalid calibration for '{muscle}': flexed {flexed} must exceed relaxed {relaxed}")]
    InvalidCalibration {
        /// Muscle being calibrated
        muscle: String,
        /// Recorded relaxed baseline
        relaxed: u16,
        /// Rejected flexed value
        flexed: u16,
    },

    /// Calibration command not allowed from the current step
    #[error("cannot {action} for '{muscle}' while in {from:?} step")]
    InvalidStateTransition {
        /// Muscle the command addressed
        muscle: String,
        /// Step the muscle was in
        from: CalibrationStep,
        /// Rejected command
        action: &'static str,
    },

    /// A recording hold window is still open for this muscle
    #[error("recording in progress for '{muscle}', {remaining_ms}ms remaining")]
    RecordingInProgress {
        /// Muscle being recorded
        muscle: String,
        /// Time left in the hold window
        remaining_ms: u64,
    },

    /// Muscle identifier is not registered
    #[error("unknown muscle '{muscle}'")]
    UnknownMuscle {
        /// Identifier that was looked up
        muscle: String,
    },

    /// Sample outside the ADC range, or not a number, reached the processor
    #[error("sample value {value} outside ADC range 0..={max}")]
    InvalidSample {
        /// Value as received, before any rounding
        value: f64,
        /// Largest valid ADC value
        max: u16,
    },

    /// Transport reading addressed to a different muscle
    #[error("reading for '{received}' delivered to processor for '{expected}'")]
    MuscleMismatch {
        /// Muscle of the processor
        expected: String,
        /// Muscle named by the reading
        received: String,
    },

    /// A recording hold window closed without capturing any reading
    #[error("no reading captured for '{muscle}' during the hold window")]
    NoReading {
        /// Muscle being recorded
        muscle: String,
    },

    /// Sample source failed to start or stop
    #[error("sample source error: {reason}")]
    Source {
        /// What went wrong
        reason: String,
    },

    /// Configuration loading or validation failed
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Synthetic generator misconfigured
    #[error(transparent)]
    Simulator(#[from] SimulatorError),
}

impl PipelineError {
    /// Whether the caller should fall back to uncalibrated classification
    pub fn is_not_calibrated(&self) -> bool {
        matches!(self, PipelineError::NotCalibrated { .. })
    }

    pub(crate) fn invalid_sample(value: f64) -> Self {
        PipelineError::InvalidSample {
            value,
            max: crate::config::constants::adc::MAX_VALUE,
        }
    }

    pub(crate) fn unknown_muscle(muscle: &str) -> Self {
        PipelineError::UnknownMuscle {
            muscle: muscle.to_string(),
        }
    }

    pub(crate) fn source(reason: impl Into<String>) -> Self {
        PipelineError::Source {
            reason: reason.into(),
        }
    }
}
