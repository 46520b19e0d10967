// src/processing/processor.rs
//! Raw sample to reading conversion for one muscle
//!
//! A processor owns its smoothing state, history, statistics and
//! subscribers. It is driven synchronously by whatever delivers samples
//! and is never shared between muscles.

use crate::calibration::{MuscleId, SharedCalibration};
use crate::config::constants::adc;
use crate::config::ProcessorConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::hal::types::{RawSample, SourceEvent, TransportReading};
use crate::processing::bus::{ReadingBus, ReadingCallback, Subscription};
use crate::processing::history::HistoryBuffer;
use crate::processing::reading::{Activation, ActivationLevel, Reading};
use crate::processing::smoothing::Smoother;
use crate::processing::stats::{RunningStats, SessionState, SessionStats};
use crate::utils::conversion::{adc_to_voltage, counts_to_volts, round_to};
use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// State of the link to the sample source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum LinkState {
    /// Source delivering samples
    #[default]
    Connected,
    /// Source reported a terminal disconnect
    Disconnected {
        /// Reason given by the source
        reason: String,
    },
}

impl LinkState {
    /// Link is live
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkState::Connected)
    }
}

/// Per-muscle sample processor
pub struct SampleProcessor {
    muscle: MuscleId,
    smoother: Smoother,
    history: HistoryBuffer<Reading>,
    stats: RunningStats,
    state: SessionState,
    link: LinkState,
    interval: Duration,
    calibration: Option<SharedCalibration>,
    bus: ReadingBus,
}

impl SampleProcessor {
    /// Processor with the wall-clock session tick and no calibration
    pub fn new(muscle: impl Into<MuscleId>, config: &ProcessorConfig) -> Self {
        Self {
            muscle: muscle.into(),
            smoother: Smoother::from_config(&config.smoothing),
            history: HistoryBuffer::new(config.history_capacity),
            stats: RunningStats::new(),
            state: SessionState::Idle,
            link: LinkState::Connected,
            interval: Duration::from_millis(crate::config::constants::sampling::SESSION_INTERVAL_MS),
            calibration: None,
            bus: ReadingBus::new(),
        }
    }

    /// Classify against this store once the muscle is calibrated
    pub fn with_calibration(mut self, store: SharedCalibration) -> Self {
        self.calibration = Some(store);
        self
    }

    /// Sampling interval added to the session duration per reading
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Change the per-reading session interval
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Convert a raw sample into a reading, record it and notify subscribers.
    /// Values above the ADC range are rejected without touching any state.
    pub fn process(&mut self, raw: RawSample) -> PipelineResult<Reading> {
        if raw.value > adc::MAX_VALUE {
            warn!(muscle = %self.muscle, value = raw.value, "raw sample out of range");
            return Err(PipelineError::invalid_sample(f64::from(raw.value)));
        }

        self.feed_calibration(raw.value);
        let smoothed_counts = self.smoother.update(f64::from(raw.value));
        let smoothed_value = round_to(counts_to_volts(smoothed_counts), adc::VOLTAGE_DECIMALS);

        let reading = Reading {
            timestamp: raw.timestamp,
            raw_value: raw.value,
            voltage: adc_to_voltage(raw.value),
            smoothed_value,
            activation: self.classify(smoothed_counts, smoothed_value),
        };

        self.history.push(reading);
        if self.state != SessionState::Stopped {
            self.stats.record(raw.value, self.interval);
        }
        trace!(muscle = %self.muscle, raw = raw.value, smoothed = smoothed_value, "reading processed");

        self.bus.publish(&reading);
        Ok(reading)
    }

    /// Process a reading delivered directly by a transport
    pub fn process_transport(&mut self, reading: &TransportReading, received_at: u64) -> PipelineResult<Reading> {
        if reading.muscle_group != self.muscle.as_str() {
            return Err(PipelineError::MuscleMismatch {
                expected: self.muscle.to_string(),
                received: reading.muscle_group.clone(),
            });
        }

        let value = reading.emg_value.round();
        if !(0.0..=f64::from(adc::MAX_VALUE)).contains(&value) {
            warn!(muscle = %self.muscle, value = reading.emg_value, "transport value out of range");
            return Err(PipelineError::invalid_sample(reading.emg_value));
        }

        self.process(RawSample::new(value as u16, received_at))
    }

    /// Apply a source event. Returns the reading for sample events.
    pub fn handle_event(&mut self, event: SourceEvent) -> PipelineResult<Option<Reading>> {
        match event {
            SourceEvent::Sample(raw) => self.process(raw).map(Some),
            SourceEvent::Disconnected { reason } => {
                warn!(muscle = %self.muscle, %reason, "sample source disconnected");
                self.link = LinkState::Disconnected { reason };
                Ok(None)
            }
        }
    }

    /// Begin recording: peak and duration restart
    pub fn start_session(&mut self) {
        self.stats.restart_session();
        self.state = SessionState::Active;
        info!(muscle = %self.muscle, "session started");
    }

    /// Freeze statistics; history keeps updating
    pub fn stop_session(&mut self) {
        self.state = SessionState::Stopped;
        info!(muscle = %self.muscle, duration = self.stats.snapshot().duration_seconds, "session stopped");
    }

    /// Clear history and statistics
    pub fn reset_stats(&mut self) {
        self.history.clear();
        self.stats.reset();
        self.smoother.reset();
        if self.state == SessionState::Stopped {
            self.state = SessionState::Idle;
        }
        debug!(muscle = %self.muscle, "stats reset");
    }

    /// Mark the link as live again after a source is (re)attached
    pub fn mark_connected(&mut self) {
        self.link = LinkState::Connected;
    }

    /// Register a callback for every processed reading
    pub fn on_reading(&self, callback: ReadingCallback) -> Subscription {
        self.bus.subscribe(callback)
    }

    /// Register a bounded channel for every processed reading
    pub fn subscribe_channel(&self, capacity: usize) -> (Subscription, Receiver<Reading>) {
        self.bus.subscribe_channel(capacity)
    }

    /// Statistics snapshot
    pub fn stats(&self) -> SessionStats {
        self.stats.snapshot()
    }

    /// History, oldest first
    pub fn history(&self) -> Vec<Reading> {
        self.history.to_vec()
    }

    /// Most recent reading
    pub fn latest(&self) -> Option<&Reading> {
        self.history.latest()
    }

    /// Readings kept in history
    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Session lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// State of the link to the source
    pub fn link_state(&self) -> &LinkState {
        &self.link
    }

    /// Muscle this processor serves
    pub fn muscle(&self) -> &MuscleId {
        &self.muscle
    }

    /// Hand the raw value to an open calibration capture for this muscle
    fn feed_calibration(&self, value: u16) {
        let Some(store) = &self.calibration else {
            return;
        };
        if store.read().is_recording(self.muscle.as_str()) {
            if let Err(err) = store.write().observe(self.muscle.as_str(), value) {
                warn!(muscle = %self.muscle, error = %err, "calibration sample dropped");
            }
        }
    }

    fn classify(&self, smoothed_counts: f64, smoothed_volts: f64) -> Activation {
        let fallback = Activation::Uncalibrated(ActivationLevel::from_volts(smoothed_volts));
        let Some(store) = &self.calibration else {
            return fallback;
        };

        match store.read().classify(self.muscle.as_str(), smoothed_counts) {
            Ok(status) => Activation::Calibrated(status),
            Err(_) => fallback,
        }
    }
}

impl std::fmt::Debug for SampleProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleProcessor")
            .field("muscle", &self.muscle)
            .field("state", &self.state)
            .field("link", &self.link)
            .field("history", &self.history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{ActivationStatus, CalibrationStore};
    use crate::config::{CalibrationConfig, SmoothingConfig, SmoothingKind};
    use crate::utils::time::MockTimeProvider;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn passthrough(capacity: usize) -> ProcessorConfig {
        ProcessorConfig {
            history_capacity: capacity,
            smoothing: SmoothingConfig {
                method: SmoothingKind::Passthrough,
                ..SmoothingConfig::default()
            },
        }
    }

    fn sample(value: u16, ts: u64) -> RawSample {
        RawSample::new(value, ts)
    }

    #[test]
    fn test_reading_fields() {
        let mut processor = SampleProcessor::new("bicep-left", &passthrough(20));
        let reading = processor.process(sample(700, 42)).unwrap();

        assert_eq!(reading.timestamp, 42);
        assert_eq!(reading.raw_value, 700);
        assert_eq!(reading.voltage, 3.42);
        assert_eq!(reading.smoothed_value, 3.42);
        assert_eq!(reading.activation, Activation::Uncalibrated(ActivationLevel::High));
    }

    #[test]
    fn test_moving_average_smoothing() {
        let mut processor = SampleProcessor::new("bicep-left", &ProcessorConfig::default());
        processor.process(sample(0, 1)).unwrap();
        let reading = processor.process(sample(1000, 2)).unwrap();

        // mean 500 counts = 2.44140625 V
        assert_eq!(reading.smoothed_value, 2.44);
        assert_eq!(reading.voltage, 4.88);
        assert_eq!(reading.activation, Activation::Uncalibrated(ActivationLevel::Moderate));
    }

    #[test]
    fn test_out_of_range_leaves_state_untouched() {
        let mut processor = SampleProcessor::new("bicep-left", &passthrough(20));
        processor.process(sample(100, 1)).unwrap();
        let before = processor.stats();

        let err = processor.process(sample(1024, 2)).unwrap_err();
        assert_eq!(err, PipelineError::InvalidSample { value: 1024.0, max: 1023 });
        assert_eq!(processor.stats(), before);
        assert_eq!(processor.history().len(), 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut processor = SampleProcessor::new("bicep-left", &passthrough(20));
        for i in 0..25u16 {
            processor.process(sample(i, u64::from(i))).unwrap();
        }

        let history = processor.history();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].raw_value, 5);
        assert_eq!(history[19].raw_value, 24);
    }

    #[test]
    fn test_stats_and_session_lifecycle() {
        let mut processor =
            SampleProcessor::new("bicep-left", &passthrough(50)).with_interval(Duration::from_millis(500));
        processor.process(sample(900, 1)).unwrap();
        processor.process(sample(100, 2)).unwrap();

        processor.start_session();
        assert_eq!(processor.state(), SessionState::Active);
        let stats = processor.stats();
        assert_eq!(stats.peak, 0);
        assert_eq!(stats.duration_seconds, 0.0);
        assert_eq!(stats.average, 500.0);

        processor.process(sample(300, 3)).unwrap();
        processor.stop_session();
        let frozen = processor.stats();
        assert_eq!(frozen.peak, 300);
        assert_eq!(frozen.duration_seconds, 0.5);

        processor.process(sample(1000, 4)).unwrap();
        assert_eq!(processor.stats(), frozen);
        assert_eq!(processor.history().len(), 4);

        processor.reset_stats();
        assert_eq!(processor.stats(), SessionStats::default());
        assert!(processor.history().is_empty());
        assert_eq!(processor.state(), SessionState::Idle);
    }

    #[test]
    fn test_calibrated_classification() {
        let clock = Arc::new(MockTimeProvider::new(0));
        let config = CalibrationConfig {
            hold_ms: 0,
            ..CalibrationConfig::default()
        };
        let store = CalibrationStore::with_default_muscles(&config, clock).into_shared();

        let mut processor = SampleProcessor::new("bicep-left", &passthrough(20)).with_calibration(store.clone());
        assert!(!processor.process(sample(380, 1)).unwrap().activation.is_calibrated());

        {
            let mut store = store.write();
            store.confirm_placement("bicep-left").unwrap();
            store.start_relaxed("bicep-left").unwrap();
        }
        processor.process(sample(200, 2)).unwrap();
        store.write().finish_recording("bicep-left").unwrap();
        store.write().start_flexed("bicep-left").unwrap();
        processor.process(sample(600, 3)).unwrap();
        store.write().finish_recording("bicep-left").unwrap();
        assert_eq!(store.read().get("bicep-left").unwrap().flexed_value, Some(600));

        let expectations = [
            (380, ActivationStatus::Moderate),
            (319, ActivationStatus::Relaxed),
            (481, ActivationStatus::Active),
            (721, ActivationStatus::Fatigue),
        ];
        for (value, status) in expectations {
            let reading = processor.process(sample(value, 2)).unwrap();
            assert_eq!(reading.activation, Activation::Calibrated(status), "value {value}");
        }
    }

    #[test]
    fn test_transport_readings() {
        let mut processor = SampleProcessor::new("bicep-left", &passthrough(20));
        let mut reading = TransportReading {
            device_id: "HC-05".into(),
            muscle_group: "tricep-left".into(),
            emg_value: 512.0,
            voltage: 2.5,
            timestamp: "2024-05-01T10:00:00Z".into(),
            session_id: "s".into(),
            user_id: "u".into(),
        };

        assert!(matches!(
            processor.process_transport(&reading, 1),
            Err(PipelineError::MuscleMismatch { .. })
        ));

        reading.muscle_group = "bicep-left".into();
        assert_eq!(processor.process_transport(&reading, 1).unwrap().raw_value, 512);

        reading.emg_value = 2048.0;
        assert!(matches!(
            processor.process_transport(&reading, 2),
            Err(PipelineError::InvalidSample { value, .. }) if value == 2048.0
        ));
    }

    #[test]
    fn test_negative_and_nan_transport_values_are_reported_as_received() {
        let mut processor = SampleProcessor::new("bicep-left", &passthrough(20));
        let mut reading = TransportReading {
            device_id: "HC-05".into(),
            muscle_group: "bicep-left".into(),
            emg_value: -5.0,
            voltage: 0.0,
            timestamp: "2024-05-01T10:00:00Z".into(),
            session_id: "s".into(),
            user_id: "u".into(),
        };

        let err = processor.process_transport(&reading, 1).unwrap_err();
        assert_eq!(err, PipelineError::InvalidSample { value: -5.0, max: 1023 });
        assert!(err.to_string().contains("-5"));

        reading.emg_value = f64::NAN;
        match processor.process_transport(&reading, 2) {
            Err(PipelineError::InvalidSample { value, .. }) => assert!(value.is_nan()),
            other => panic!("expected invalid sample, got {:?}", other),
        }
        assert!(processor.history().is_empty());
    }

    #[test]
    fn test_disconnect_keeps_last_stats() {
        let mut processor = SampleProcessor::new("bicep-left", &passthrough(20));
        processor.handle_event(SourceEvent::Sample(sample(400, 1))).unwrap();
        let outcome = processor
            .handle_event(SourceEvent::Disconnected { reason: "link lost".into() })
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(
            processor.link_state(),
            &LinkState::Disconnected { reason: "link lost".into() }
        );
        assert_eq!(processor.stats().current, 400);
        assert_eq!(processor.history().len(), 1);
    }

    #[test]
    fn test_subscribers_see_each_reading() {
        let mut processor = SampleProcessor::new("bicep-left", &passthrough(20));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = processor.on_reading(Box::new(move |r| sink.lock().push(r.raw_value)));
        let (_chan, rx) = processor.subscribe_channel(8);

        processor.process(sample(10, 1)).unwrap();
        processor.process(sample(20, 2)).unwrap();
        sub.unsubscribe();
        processor.process(sample(30, 3)).unwrap();

        assert_eq!(*seen.lock(), vec![10, 20]);
        assert_eq!(rx.try_iter().map(|r| r.raw_value).collect::<Vec<_>>(), vec![10, 20, 30]);
    }
}
