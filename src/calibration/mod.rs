// src/calibration/mod.rs
//! Calibration store: relaxed/flexed baselines and activation bands

pub mod entry;
pub mod muscles;
pub mod store;

pub use entry::{ActivationBands, ActivationStatus, CalibrationEntry, CalibrationStep};
pub use muscles::{MuscleId, MuscleSite, Side, CATALOG};
pub use store::CalibrationStore;

use parking_lot::RwLock;
use std::sync::Arc;

/// Store shared between the pipeline and its processors
pub type SharedCalibration = Arc<RwLock<CalibrationStore>>;

impl CalibrationStore {
    /// Wrap the store for sharing with processors
    pub fn into_shared(self) -> SharedCalibration {
        Arc::new(RwLock::new(self))
    }
}
