// src/pipeline.rs
//! Coordinator wiring sources, processors and the calibration store
//!
//! One processor per muscle, each behind its own mutex. The calibration
//! store is shared by every processor through a read-write lock. Sources
//! call into their muscle's processor from their worker thread.

use crate::calibration::{CalibrationEntry, CalibrationStep, CalibrationStore, MuscleId, SharedCalibration};
use crate::config::{ConfigError, PipelineConfig, ThresholdZone};
use crate::error::{PipelineError, PipelineResult};
use crate::hal::{SampleSource, SourceHandle};
use crate::processing::{Reading, ReadingCallback, SampleProcessor, SessionStats, Subscription};
use crate::utils::time::{system_clock, SharedClock};
use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Processor shared with the source driving it
pub type SharedProcessor = Arc<Mutex<SampleProcessor>>;

/// Multi-muscle pipeline: one processor per muscle plus the shared calibration store
pub struct EmgPipeline {
    config: PipelineConfig,
    calibration: SharedCalibration,
    processors: HashMap<MuscleId, SharedProcessor>,
    sources: HashMap<MuscleId, SourceHandle>,
}

impl EmgPipeline {
    /// Pipeline on the wall clock. Fails on an invalid config.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        Self::with_clock(config, system_clock())
    }

    /// Pipeline whose calibration holds run on `clock`
    pub fn with_clock(config: PipelineConfig, clock: SharedClock) -> PipelineResult<Self> {
        config.validate().map_err(ConfigError::Invalid)?;

        let store = CalibrationStore::with_default_muscles(&config.calibration, clock);
        let muscles: Vec<MuscleId> = store.entries().map(|e| e.muscle.clone()).collect();

        let mut pipeline = Self {
            config,
            calibration: store.into_shared(),
            processors: HashMap::new(),
            sources: HashMap::new(),
        };
        for muscle in muscles {
            pipeline.add_muscle(muscle);
        }

        info!(muscles = pipeline.processors.len(), "pipeline ready");
        Ok(pipeline)
    }

    /// Validated configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Register a muscle and create its processor if needed
    pub fn add_muscle(&mut self, muscle: impl Into<MuscleId>) -> SharedProcessor {
        let muscle = muscle.into();
        self.calibration.write().register(muscle.clone());

        self.processors
            .entry(muscle.clone())
            .or_insert_with(|| {
                debug!(muscle = %muscle, "creating processor");
                let processor = SampleProcessor::new(muscle.clone(), &self.config.processor)
                    .with_calibration(self.calibration.clone())
                    .with_interval(Duration::from_millis(self.config.sampling.session_interval_ms));
                Arc::new(Mutex::new(processor))
            })
            .clone()
    }

    /// Processor of a registered muscle
    pub fn processor(&self, muscle: &str) -> PipelineResult<SharedProcessor> {
        self.processors
            .get(muscle)
            .cloned()
            .ok_or_else(|| PipelineError::unknown_muscle(muscle))
    }

    /// Registered muscles, in no particular order
    pub fn muscles(&self) -> impl Iterator<Item = &MuscleId> {
        self.processors.keys()
    }

    /// Shared calibration store
    pub fn calibration(&self) -> SharedCalibration {
        self.calibration.clone()
    }

    /// Feed a muscle's processor from `source`, replacing any source
    /// already attached to it
    pub fn attach_source(&mut self, muscle: &str, source: &mut dyn SampleSource) -> PipelineResult<()> {
        let processor = self.processor(muscle)?;
        self.detach_source(muscle);

        {
            let mut guard = processor.lock();
            guard.set_interval(source.interval());
            guard.mark_connected();
        }

        let target = processor.clone();
        let name = muscle.to_string();
        let handle = source.start(Box::new(move |event| {
            if let Err(e) = target.lock().handle_event(event) {
                warn!(muscle = %name, error = %e, "dropping source event");
            }
        }))?;

        info!(muscle, source = source.name(), "source attached");
        self.sources.insert(MuscleId::from(muscle), handle);
        Ok(())
    }

    /// Stop the muscle's source. Returns whether one was attached.
    pub fn detach_source(&mut self, muscle: &str) -> bool {
        match self.sources.remove(muscle) {
            Some(mut handle) => {
                handle.stop();
                debug!(muscle, "source detached");
                true
            }
            None => false,
        }
    }

    /// Whether a source is attached and still delivering
    pub fn is_source_running(&self, muscle: &str) -> bool {
        self.sources.get(muscle).is_some_and(SourceHandle::is_running)
    }

    /// Subscribe a callback to a muscle's readings
    pub fn on_reading(&self, muscle: &str, callback: ReadingCallback) -> PipelineResult<Subscription> {
        Ok(self.processor(muscle)?.lock().on_reading(callback))
    }

    /// Subscribe a bounded channel to a muscle's readings
    pub fn subscribe_channel(&self, muscle: &str, capacity: usize) -> PipelineResult<(Subscription, Receiver<Reading>)> {
        Ok(self.processor(muscle)?.lock().subscribe_channel(capacity))
    }

    /// Statistics snapshot of a muscle
    pub fn get_stats(&self, muscle: &str) -> PipelineResult<SessionStats> {
        Ok(self.processor(muscle)?.lock().stats())
    }

    /// Readings kept for the muscle, oldest first
    pub fn get_history(&self, muscle: &str) -> PipelineResult<Vec<Reading>> {
        Ok(self.processor(muscle)?.lock().history())
    }

    /// Calibration entry of a muscle
    pub fn get_calibration(&self, muscle: &str) -> PipelineResult<CalibrationEntry> {
        self.calibration
            .read()
            .get(muscle)
            .cloned()
            .ok_or_else(|| PipelineError::unknown_muscle(muscle))
    }

    /// Alert zone of the muscle's latest raw value, if it has one
    pub fn alert_zone(&self, muscle: &str) -> PipelineResult<Option<ThresholdZone>> {
        let thresholds = self.config.alerts.thresholds();
        Ok(self
            .processor(muscle)?
            .lock()
            .latest()
            .map(|reading| thresholds.zone(reading.raw_value)))
    }

    /// Start sensor placement, registering the muscle if it is new
    pub fn begin_placement(&mut self, muscle: &str) -> PipelineResult<CalibrationStep> {
        if self.calibration.read().get(muscle).is_none() {
            self.add_muscle(muscle);
        }
        self.calibration.write().begin_placement(muscle)
    }

    /// Sensor is in place; move on to the relaxed recording
    pub fn confirm_placement(&self, muscle: &str) -> PipelineResult<CalibrationStep> {
        self.calibration.write().confirm_placement(muscle)
    }

    /// Start the relaxed recording. Live samples processed for the muscle
    /// during the hold window are captured; call
    /// [`finish_recording`](Self::finish_recording) once it closes.
    pub fn record_relaxed(&self, muscle: &str) -> PipelineResult<CalibrationStep> {
        self.calibration.write().start_relaxed(muscle)
    }

    /// Start the flexed recording, captured the same way as the relaxed one
    pub fn record_flexed(&self, muscle: &str) -> PipelineResult<CalibrationStep> {
        self.calibration.write().start_flexed(muscle)
    }

    /// Commit the mean of the samples captured during the closed hold window
    pub fn finish_recording(&self, muscle: &str) -> PipelineResult<CalibrationStep> {
        self.calibration.write().finish_recording(muscle)
    }

    /// Milliseconds left before the muscle's recording can be finished
    pub fn hold_remaining(&self, muscle: &str) -> u64 {
        self.calibration.read().hold_remaining(muscle)
    }

    /// Step the wizard backwards
    pub fn back(&self) -> PipelineResult<(MuscleId, CalibrationStep)> {
        self.calibration.write().back()
    }

    /// Move the wizard to the next muscle
    pub fn advance(&self) -> PipelineResult<Option<MuscleId>> {
        self.calibration.write().advance()
    }

    /// Wizard completion in percent
    pub fn calibration_progress(&self) -> f64 {
        self.calibration.read().progress()
    }

    /// Restart peak and duration for a muscle
    pub fn start_session(&self, muscle: &str) -> PipelineResult<()> {
        self.processor(muscle)?.lock().start_session();
        Ok(())
    }

    /// Freeze a muscle's statistics
    pub fn stop_session(&self, muscle: &str) -> PipelineResult<()> {
        self.processor(muscle)?.lock().stop_session();
        Ok(())
    }

    /// Clear a muscle's history and statistics
    pub fn reset_stats(&self, muscle: &str) -> PipelineResult<()> {
        self.processor(muscle)?.lock().reset_stats();
        Ok(())
    }

    /// Stop every attached source
    pub fn shutdown(&mut self) {
        let muscles: Vec<MuscleId> = self.sources.keys().cloned().collect();
        for muscle in muscles {
            self.detach_source(muscle.as_str());
        }
    }
}

impl Drop for EmgPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{RawSample, SignalProfile, SimulatorConfig, SyntheticSource, TransportSource};
    use crate::utils::time::MockTimeProvider;
    use std::time::Instant;

    fn pipeline() -> EmgPipeline {
        let mut config = PipelineConfig::default();
        config.calibration.hold_ms = 0;
        EmgPipeline::with_clock(config, Arc::new(MockTimeProvider::new(0))).unwrap()
    }

    fn feed(pipeline: &EmgPipeline, muscle: &str, value: u16) {
        pipeline
            .processor(muscle)
            .unwrap()
            .lock()
            .process(RawSample::new(value, 0))
            .unwrap();
    }

    fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_default_muscles_registered() {
        let pipeline = pipeline();
        assert_eq!(pipeline.muscles().count(), 6);
        assert!(pipeline.get_stats("bicep-left").is_ok());
        assert!(matches!(
            pipeline.get_stats("forearm-left"),
            Err(PipelineError::UnknownMuscle { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.processor.history_capacity = 0;
        assert!(matches!(
            EmgPipeline::new(config),
            Err(PipelineError::Configuration(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_record_captures_live_values() {
        let pipeline = pipeline();
        assert_eq!(pipeline.confirm_placement("bicep-left").unwrap(), CalibrationStep::Relaxed);
        pipeline.record_relaxed("bicep-left").unwrap();
        assert!(matches!(
            pipeline.finish_recording("bicep-left"),
            Err(PipelineError::NoReading { .. })
        ));

        assert_eq!(pipeline.record_relaxed("bicep-left").unwrap(), CalibrationStep::Relaxed);
        feed(&pipeline, "bicep-left", 210);
        assert_eq!(pipeline.finish_recording("bicep-left").unwrap(), CalibrationStep::Flexed);
        pipeline.record_flexed("bicep-left").unwrap();
        feed(&pipeline, "bicep-left", 620);
        assert_eq!(pipeline.finish_recording("bicep-left").unwrap(), CalibrationStep::Complete);

        let entry = pipeline.get_calibration("bicep-left").unwrap();
        assert_eq!((entry.relaxed_value, entry.flexed_value), (Some(210), Some(620)));
        assert!(entry.calibrated);
    }

    #[test]
    fn test_relaxed_baseline_reflects_held_values() {
        let clock = Arc::new(MockTimeProvider::new(0));
        let pipeline = EmgPipeline::with_clock(PipelineConfig::default(), clock.clone()).unwrap();
        pipeline.confirm_placement("bicep-left").unwrap();

        feed(&pipeline, "bicep-left", 200);
        pipeline.record_relaxed("bicep-left").unwrap();
        for value in [260, 270, 280] {
            clock.advance_by(500);
            feed(&pipeline, "bicep-left", value);
        }
        assert!(matches!(
            pipeline.finish_recording("bicep-left"),
            Err(PipelineError::RecordingInProgress { remaining_ms: 500, .. })
        ));

        clock.advance_by(600);
        feed(&pipeline, "bicep-left", 900);
        assert_eq!(pipeline.hold_remaining("bicep-left"), 0);
        assert_eq!(pipeline.finish_recording("bicep-left").unwrap(), CalibrationStep::Flexed);
        assert_eq!(pipeline.get_calibration("bicep-left").unwrap().relaxed_value, Some(270));
    }

    #[test]
    fn test_begin_placement_adds_processor() {
        let mut pipeline = pipeline();
        pipeline.begin_placement("traps").unwrap();
        assert!(pipeline.processor("traps").is_ok());
        assert_eq!(pipeline.get_calibration("traps").unwrap().step, CalibrationStep::Placement);
    }

    #[test]
    fn test_alert_zone() {
        let pipeline = pipeline();
        assert_eq!(pipeline.alert_zone("abs").ok(), None);
        assert_eq!(pipeline.alert_zone("bicep-left").unwrap(), None);

        feed(&pipeline, "bicep-left", 720);
        assert_eq!(pipeline.alert_zone("bicep-left").unwrap(), Some(ThresholdZone::Fatigue));
    }

    #[test]
    fn test_synthetic_source_drives_processor() {
        let mut pipeline = pipeline();
        let mut config = SimulatorConfig::for_profile(SignalProfile::CalibrationRelaxed, 5);
        config.interval_ms = 1;
        let mut source = SyntheticSource::new(config).unwrap();

        pipeline.attach_source("bicep-left", &mut source).unwrap();
        assert!(wait_until(|| pipeline.get_history("bicep-left").unwrap().len() >= 5));

        assert!(pipeline.detach_source("bicep-left"));
        let frozen = pipeline.get_history("bicep-left").unwrap().len();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(pipeline.get_history("bicep-left").unwrap().len(), frozen);
        assert!(!pipeline.detach_source("bicep-left"));
    }

    #[test]
    fn test_transport_disconnect_recorded() {
        let mut pipeline = pipeline();
        let (mut source, feed) = TransportSource::new("ble", Some("bicep-left"), Duration::from_millis(500));
        pipeline.attach_source("bicep-left", &mut source).unwrap();

        feed.disconnect("peripheral gone");
        let processor = pipeline.processor("bicep-left").unwrap();
        assert!(wait_until(|| !processor.lock().link_state().is_connected()));
        assert!(wait_until(|| !pipeline.is_source_running("bicep-left")));
        pipeline.shutdown();
    }
}
