// src/calibration/store.rs
//! Per-muscle calibration state machine
//!
//! Each muscle walks `Placement -> Relaxed -> Flexed -> Complete`. A baseline
//! is recorded in two phases: starting the recording opens a hold window on
//! the muscle and a pending capture, live samples observed while the window
//! is open are accumulated, and finishing the recording commits their mean.
//! Any other command for the muscle issued before the window closes is
//! rejected with `RecordingInProgress`.

use crate::calibration::entry::{ActivationStatus, CalibrationEntry, CalibrationStep};
use crate::calibration::muscles::{wizard_sequence, MuscleId};
use crate::config::constants::adc;
use crate::config::CalibrationConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::utils::time::SharedClock;
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

/// Samples accumulated for a pending baseline
#[derive(Debug, Clone, Copy)]
struct Capture {
    target: CalibrationStep,
    until: u64,
    sum: u64,
    count: u64,
}

impl Capture {
    fn mean(&self) -> Option<u16> {
        if self.count == 0 {
            return None;
        }
        u16::try_from((self.sum + self.count / 2) / self.count).ok()
    }
}

struct Slot {
    entry: CalibrationEntry,
    capture: Option<Capture>,
}

impl Slot {
    fn hold_until(&self) -> u64 {
        self.capture.map_or(0, |capture| capture.until)
    }
}

/// Keyed store of calibration entries plus the wizard cursor
pub struct CalibrationStore {
    slots: Vec<Slot>,
    index: HashMap<MuscleId, usize>,
    cursor: usize,
    hold_ms: u64,
    clock: SharedClock,
}

impl CalibrationStore {
    /// Empty store
    pub fn new(config: &CalibrationConfig, clock: SharedClock) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
            hold_ms: config.hold_ms,
            clock,
        }
    }

    /// Store pre-registered with the configured wizard sequence
    pub fn with_default_muscles(config: &CalibrationConfig, clock: SharedClock) -> Self {
        let mut store = Self::new(config, clock);
        for muscle in wizard_sequence(config.wizard_muscles) {
            store.register(muscle);
        }
        store
    }

    /// Add a muscle in `Placement` if it is not known yet. Returns its step.
    pub fn register(&mut self, muscle: impl Into<MuscleId>) -> CalibrationStep {
        let muscle = muscle.into();
        if let Some(&i) = self.index.get(&muscle) {
            return self.slots[i].entry.step;
        }

        debug!(muscle = %muscle, "registering muscle");
        self.index.insert(muscle.clone(), self.slots.len());
        self.slots.push(Slot {
            entry: CalibrationEntry::new(muscle),
            capture: None,
        });
        CalibrationStep::Placement
    }

    /// Start (or restart) sensor placement for a muscle and make it current.
    /// Recorded values are kept; a pending capture is dropped.
    pub fn begin_placement(&mut self, muscle: &str) -> PipelineResult<CalibrationStep> {
        if let Some(&i) = self.index.get(muscle) {
            self.check_hold(i)?;
        }
        self.register(muscle);
        let i = self.slot_index(muscle)?;

        self.discard_capture(i);
        self.cursor = i;
        self.transition(i, CalibrationStep::Placement);
        Ok(CalibrationStep::Placement)
    }

    /// Sensor is in place; move on to the relaxed recording
    pub fn confirm_placement(&mut self, muscle: &str) -> PipelineResult<CalibrationStep> {
        let i = self.slot_index(muscle)?;
        self.check_hold(i)?;
        self.expect_step(i, CalibrationStep::Placement, "confirm placement")?;

        self.transition(i, CalibrationStep::Relaxed);
        Ok(CalibrationStep::Relaxed)
    }

    /// Open the hold window for the relaxed baseline. The muscle stays in
    /// `Relaxed` until [`finish_recording`](Self::finish_recording) commits
    /// the captured value.
    pub fn start_relaxed(&mut self, muscle: &str) -> PipelineResult<CalibrationStep> {
        let i = self.slot_index(muscle)?;
        self.check_hold(i)?;
        self.expect_step(i, CalibrationStep::Relaxed, "record relaxed")?;

        self.open_capture(i, CalibrationStep::Relaxed);
        Ok(CalibrationStep::Relaxed)
    }

    /// Open the hold window for the flexed baseline. Requires a relaxed
    /// baseline.
    pub fn start_flexed(&mut self, muscle: &str) -> PipelineResult<CalibrationStep> {
        let i = self.slot_index(muscle)?;
        self.check_hold(i)?;
        self.expect_step(i, CalibrationStep::Flexed, "record flexed")?;
        if self.slots[i].entry.relaxed_value.is_none() {
            return Err(self.reject(PipelineError::InvalidStateTransition {
                muscle: muscle.to_string(),
                from: CalibrationStep::Flexed,
                action: "record flexed",
            }));
        }

        self.open_capture(i, CalibrationStep::Flexed);
        Ok(CalibrationStep::Flexed)
    }

    /// Feed a live sample to the muscle's pending capture. Returns whether
    /// the sample was captured; samples outside an open window are ignored.
    pub fn observe(&mut self, muscle: &str, value: u16) -> PipelineResult<bool> {
        check_range(value)?;
        let now = self.clock.now_millis();
        let Some(&i) = self.index.get(muscle) else {
            return Ok(false);
        };
        let Some(capture) = self.slots[i].capture.as_mut().filter(|capture| now <= capture.until) else {
            return Ok(false);
        };

        capture.sum += u64::from(value);
        capture.count += 1;
        trace!(muscle, value, count = capture.count, "calibration sample captured");
        Ok(true)
    }

    /// Commit the mean of the samples captured during a closed hold window
    /// and advance the step. A flexed mean that does not exceed the relaxed
    /// baseline is rejected and the muscle stays in `Flexed`.
    pub fn finish_recording(&mut self, muscle: &str) -> PipelineResult<CalibrationStep> {
        let i = self.slot_index(muscle)?;
        let Some(capture) = self.slots[i].capture else {
            return Err(self.reject(PipelineError::InvalidStateTransition {
                muscle: muscle.to_string(),
                from: self.slots[i].entry.step,
                action: "finish recording",
            }));
        };
        self.check_hold(i)?;
        self.slots[i].capture = None;

        let Some(value) = capture.mean() else {
            return Err(self.reject(PipelineError::NoReading {
                muscle: muscle.to_string(),
            }));
        };

        match capture.target {
            CalibrationStep::Relaxed => {
                let entry = &mut self.slots[i].entry;
                entry.relaxed_value = Some(value);
                entry.flexed_value = None;
                entry.calibrated = false;
                info!(muscle, value, samples = capture.count, "relaxed baseline recorded");

                self.transition(i, CalibrationStep::Flexed);
                Ok(CalibrationStep::Flexed)
            }
            _ => {
                let relaxed = self.slots[i].entry.relaxed_value.unwrap_or(0);
                if value <= relaxed {
                    return Err(self.reject(PipelineError::InvalidCalibration {
                        muscle: muscle.to_string(),
                        relaxed,
                        flexed: value,
                    }));
                }

                let entry = &mut self.slots[i].entry;
                entry.flexed_value = Some(value);
                entry.calibrated = true;
                info!(muscle, relaxed, flexed = value, samples = capture.count, "muscle calibrated");

                self.transition(i, CalibrationStep::Complete);
                Ok(CalibrationStep::Complete)
            }
        }
    }

    /// Step the wizard backwards from the current muscle. Returns the muscle
    /// that is current afterwards and its step.
    pub fn back(&mut self) -> PipelineResult<(MuscleId, CalibrationStep)> {
        let i = self.current_index()?;
        self.check_hold(i)?;
        self.discard_capture(i);

        let target = match self.slots[i].entry.step {
            CalibrationStep::Flexed => CalibrationStep::Relaxed,
            CalibrationStep::Relaxed => CalibrationStep::Placement,
            CalibrationStep::Complete => CalibrationStep::Flexed,
            CalibrationStep::Placement if i > 0 => {
                self.cursor = i - 1;
                let previous = &self.slots[i - 1].entry;
                let step = if previous.calibrated {
                    CalibrationStep::Complete
                } else {
                    previous.step
                };
                self.transition(i - 1, step);
                return Ok((self.slots[i - 1].entry.muscle.clone(), step));
            }
            CalibrationStep::Placement => {
                return Err(self.reject(PipelineError::InvalidStateTransition {
                    muscle: self.slots[i].entry.muscle.to_string(),
                    from: CalibrationStep::Placement,
                    action: "go back",
                }));
            }
        };

        self.transition(i, target);
        Ok((self.slots[i].entry.muscle.clone(), target))
    }

    /// Move from a completed muscle to the next one in registration order.
    /// Returns `None` once the last muscle is complete.
    pub fn advance(&mut self) -> PipelineResult<Option<MuscleId>> {
        let i = self.current_index()?;
        self.check_hold(i)?;
        self.expect_step(i, CalibrationStep::Complete, "advance")?;

        if i + 1 >= self.slots.len() {
            info!("calibration wizard finished");
            return Ok(None);
        }

        self.cursor = i + 1;
        self.transition(i + 1, CalibrationStep::Placement);
        Ok(Some(self.slots[i + 1].entry.muscle.clone()))
    }

    /// Classify a value on the raw ADC scale against a muscle's baselines
    pub fn classify(&self, muscle: &str, value: f64) -> PipelineResult<ActivationStatus> {
        self.index
            .get(muscle)
            .and_then(|&i| self.slots[i].entry.bands())
            .map(|bands| bands.classify(value))
            .ok_or_else(|| PipelineError::NotCalibrated {
                muscle: muscle.to_string(),
            })
    }

    /// Calibration entry of a muscle
    pub fn get(&self, muscle: &str) -> Option<&CalibrationEntry> {
        self.index.get(muscle).map(|&i| &self.slots[i].entry)
    }

    /// Wizard step of a muscle
    pub fn step(&self, muscle: &str) -> Option<CalibrationStep> {
        self.get(muscle).map(|entry| entry.step)
    }

    /// Entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = &CalibrationEntry> {
        self.slots.iter().map(|slot| &slot.entry)
    }

    /// Muscle under the wizard cursor
    pub fn current(&self) -> Option<&MuscleId> {
        self.slots.get(self.cursor).map(|slot| &slot.entry.muscle)
    }

    /// The muscle's hold window is still open
    pub fn is_holding(&self, muscle: &str) -> bool {
        self.hold_remaining(muscle) > 0
    }

    /// A capture is open and accepting samples for the muscle
    pub fn is_recording(&self, muscle: &str) -> bool {
        let now = self.clock.now_millis();
        self.index
            .get(muscle)
            .and_then(|&i| self.slots[i].capture)
            .is_some_and(|capture| now <= capture.until)
    }

    /// Milliseconds left in the muscle's hold window
    pub fn hold_remaining(&self, muscle: &str) -> u64 {
        self.index
            .get(muscle)
            .map(|&i| self.slots[i].hold_until().saturating_sub(self.clock.now_millis()))
            .unwrap_or(0)
    }

    /// Wizard completion in percent
    pub fn progress(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        let done = match self.slots[self.cursor].entry.step {
            CalibrationStep::Complete => 1,
            _ => 0,
        };
        (self.cursor + done) as f64 / self.slots.len() as f64 * 100.0
    }

    /// Every registered muscle has a baseline pair
    pub fn is_complete(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|slot| slot.entry.calibrated)
    }

    /// Number of registered muscles
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// No muscle is registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_index(&self, muscle: &str) -> PipelineResult<usize> {
        self.index
            .get(muscle)
            .copied()
            .ok_or_else(|| self.reject(PipelineError::unknown_muscle(muscle)))
    }

    fn current_index(&self) -> PipelineResult<usize> {
        if self.slots.is_empty() {
            return Err(self.reject(PipelineError::unknown_muscle("")));
        }
        Ok(self.cursor)
    }

    fn open_capture(&mut self, i: usize, target: CalibrationStep) {
        let until = self.clock.now_millis().saturating_add(self.hold_ms);
        let slot = &mut self.slots[i];
        slot.capture = Some(Capture {
            target,
            until,
            sum: 0,
            count: 0,
        });
        info!(muscle = %slot.entry.muscle, step = ?target, hold_ms = self.hold_ms, "recording started");
    }

    fn discard_capture(&mut self, i: usize) {
        if let Some(capture) = self.slots[i].capture.take() {
            debug!(muscle = %self.slots[i].entry.muscle, samples = capture.count, "pending capture discarded");
        }
    }

    fn check_hold(&self, i: usize) -> PipelineResult<()> {
        let remaining = self.slots[i].hold_until().saturating_sub(self.clock.now_millis());
        if remaining > 0 {
            return Err(self.reject(PipelineError::RecordingInProgress {
                muscle: self.slots[i].entry.muscle.to_string(),
                remaining_ms: remaining,
            }));
        }
        Ok(())
    }

    fn expect_step(&self, i: usize, expected: CalibrationStep, action: &'static str) -> PipelineResult<()> {
        let entry = &self.slots[i].entry;
        if entry.step != expected {
            return Err(self.reject(PipelineError::InvalidStateTransition {
                muscle: entry.muscle.to_string(),
                from: entry.step,
                action,
            }));
        }
        Ok(())
    }

    fn transition(&mut self, i: usize, to: CalibrationStep) {
        let entry = &mut self.slots[i].entry;
        debug!(muscle = %entry.muscle, from = ?entry.step, to = ?to, "calibration step");
        entry.step = to;
    }

    fn reject(&self, err: PipelineError) -> PipelineError {
        warn!(error = %err, "calibration command rejected");
        err
    }
}

fn check_range(value: u16) -> PipelineResult<()> {
    if value > adc::MAX_VALUE {
        return Err(PipelineError::invalid_sample(f64::from(value)));
    }
    Ok(())
}
