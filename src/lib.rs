//! EMG-Pipeline: turns raw EMG sensor samples into calibrated muscle readings
//!
//! - Sample sources: synthetic generator, transport feed and a tokio
//!   interval source, all behind the [`hal::SampleSource`] trait
//! - Calibration store with the guided relaxed/flexed wizard
//! - Per-muscle processor with smoothing, bounded history, session
//!   statistics and reading subscriptions
//! - Layered TOML/environment configuration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use emg_pipeline::hal::{SignalProfile, SimulatorConfig, SyntheticSource};
//! use emg_pipeline::{EmgPipeline, PipelineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut pipeline = EmgPipeline::new(PipelineConfig::default())?;
//!     let mut source = SyntheticSource::new(SimulatorConfig::for_profile(SignalProfile::Dashboard, 7))?;
//!
//!     pipeline.attach_source("bicep-left", &mut source)?;
//!     let _subscription = pipeline.on_reading(
//!         "bicep-left",
//!         Box::new(|reading| println!("{:?}", reading)),
//!     )?;
//!
//!     std::thread::sleep(std::time::Duration::from_secs(2));
//!     println!("{:?}", pipeline.get_stats("bicep-left")?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calibration;
pub mod config;
pub mod error;
pub mod hal;
pub mod pipeline;
pub mod processing;
pub mod utils;

pub use calibration::{ActivationStatus, CalibrationEntry, CalibrationStep, CalibrationStore, MuscleId};
pub use config::{ConfigLoader, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use hal::{RawSample, SampleSource, SourceEvent, SourceHandle};
pub use pipeline::EmgPipeline;
pub use processing::{Activation, Reading, SampleProcessor, SessionStats};

pub use utils::time::{current_timestamp_millis, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    let mut features = vec![
        "Synthetic and transport sample sources".to_string(),
        "Guided relaxed/flexed calibration".to_string(),
        "Smoothed, classified readings with bounded history".to_string(),
        "Session statistics".to_string(),
    ];
    if cfg!(feature = "async") {
        features.push("Tokio interval source".to_string());
    }

    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "EMG signal acquisition, calibration and session statistics pipeline".to_string(),
        features,
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
