//! Synthetic EMG sample source
//!
//! Produces `clamp(base + wave + noise [+ boost], 0, 1023)` on a fixed tick.
//! The wave is a sine of elapsed time, noise is uniform jitter from a seeded
//! RNG and the boost is an extra sine added while a session is recording.
//! Elapsed time is derived from the tick count, so a given seed always
//! yields the same value sequence regardless of scheduling jitter.

use crate::config::constants::{sampling, simulator};
use crate::error::PipelineResult;
use crate::hal::traits::{EventCallback, SampleSource};
use crate::hal::types::{RawSample, SourceEvent};
use crate::hal::worker::{run_periodic, spawn_worker, SourceHandle};
use crate::utils::conversion::clamp_to_adc;
use crate::utils::time::{system_clock, SharedClock};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Named signal shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalProfile {
    /// Resting muscle during the relaxed calibration step
    CalibrationRelaxed,
    /// Contracted muscle during the flexed calibration step
    CalibrationFlexed,
    /// Live dashboard feed
    Dashboard,
    /// Detailed session monitor, boosted while recording
    Session,
}

impl SignalProfile {
    /// Signal parameters for this profile
    pub fn waveform(self) -> Waveform {
        match self {
            SignalProfile::CalibrationRelaxed => Waveform::flat(
                simulator::RELAXED_BASE,
                simulator::CALIBRATION_NOISE_SPAN,
            ),
            SignalProfile::CalibrationFlexed => Waveform::flat(
                simulator::FLEXED_BASE,
                simulator::CALIBRATION_NOISE_SPAN,
            ),
            SignalProfile::Dashboard => Waveform {
                base: simulator::DASHBOARD_BASE,
                wave_amplitude: simulator::DASHBOARD_WAVE_AMPLITUDE,
                wave_period_ms: simulator::DASHBOARD_WAVE_PERIOD_MS,
                noise_low: 0.0,
                noise_high: simulator::DASHBOARD_NOISE_SPAN,
                boost_amplitude: 0.0,
                boost_period_ms: 0.0,
            },
            SignalProfile::Session => Waveform {
                base: simulator::SESSION_BASE,
                wave_amplitude: simulator::SESSION_WAVE_AMPLITUDE,
                wave_period_ms: simulator::SESSION_WAVE_PERIOD_MS,
                noise_low: -simulator::SESSION_NOISE_SPAN / 2.0,
                noise_high: simulator::SESSION_NOISE_SPAN / 2.0,
                boost_amplitude: simulator::SESSION_BOOST_AMPLITUDE,
                boost_period_ms: simulator::SESSION_BOOST_PERIOD_MS,
            },
        }
    }

    /// Cadence the dashboard used for this profile
    pub fn default_interval_ms(self) -> u64 {
        match self {
            SignalProfile::CalibrationRelaxed | SignalProfile::CalibrationFlexed => {
                sampling::CALIBRATION_INTERVAL_MS
            }
            SignalProfile::Dashboard | SignalProfile::Session => sampling::SESSION_INTERVAL_MS,
        }
    }
}

/// Parameters of the generated signal, in ADC counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waveform {
    /// Level the signal oscillates around
    pub base: f64,
    /// Amplitude of the base wave
    pub wave_amplitude: f64,
    /// `sin(t / period)`; zero disables the wave
    pub wave_period_ms: f64,
    /// Uniform noise range
    pub noise_low: f64,
    /// Upper end of the noise range
    pub noise_high: f64,
    /// Extra wave while boosted
    pub boost_amplitude: f64,
    /// Divisor of elapsed ms for the boost wave
    pub boost_period_ms: f64,
}

impl Waveform {
    fn flat(base: f64, noise_span: f64) -> Self {
        Self {
            base,
            wave_amplitude: 0.0,
            wave_period_ms: 0.0,
            noise_low: -noise_span / 2.0,
            noise_high: noise_span / 2.0,
            boost_amplitude: 0.0,
            boost_period_ms: 0.0,
        }
    }

    fn sine(amplitude: f64, period_ms: f64, elapsed_ms: f64) -> f64 {
        if amplitude == 0.0 || period_ms <= 0.0 {
            return 0.0;
        }
        (elapsed_ms / period_ms).sin() * amplitude
    }

    /// Noise-free signal value at `elapsed_ms`
    pub fn deterministic_value(&self, elapsed_ms: f64, boosted: bool) -> f64 {
        let mut value = self.base + Self::sine(self.wave_amplitude, self.wave_period_ms, elapsed_ms);
        if boosted {
            value += Self::sine(self.boost_amplitude, self.boost_period_ms, elapsed_ms);
        }
        value
    }
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Signal shape
    #[serde(default = "defaults::profile")]
    pub profile: SignalProfile,

    /// Tick period, at least 1
    #[serde(default = "defaults::interval_ms")]
    pub interval_ms: u64,

    /// RNG seed; equal seeds give equal signals
    #[serde(default = "defaults::seed")]
    pub seed: u64,
}

mod defaults {
    use super::SignalProfile;
    use crate::config::constants::{sampling, simulator};

    pub fn profile() -> SignalProfile { SignalProfile::Session }
    pub fn interval_ms() -> u64 { sampling::SESSION_INTERVAL_MS }
    pub fn seed() -> u64 { simulator::DEFAULT_SEED }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            profile: defaults::profile(),
            interval_ms: defaults::interval_ms(),
            seed: defaults::seed(),
        }
    }
}

impl SimulatorConfig {
    /// Config for a profile at the cadence the dashboard used for it
    pub fn for_profile(profile: SignalProfile, seed: u64) -> Self {
        Self {
            profile,
            interval_ms: profile.default_interval_ms(),
            seed,
        }
    }

    /// Reject a zero interval
    pub fn validate(&self) -> Result<(), SimulatorError> {
        if self.interval_ms == 0 {
            return Err(SimulatorError::InvalidInterval);
        }
        Ok(())
    }
}

/// Simulator errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulatorError {
    /// `interval_ms` is zero
    #[error("simulator interval must be at least 1ms")]
    InvalidInterval,
    /// The generator was already handed to a running task
    #[error("simulator already running")]
    AlreadyRunning,
}

/// Runtime controls shared between a running source and its owner
#[derive(Debug)]
pub struct GeneratorControls {
    boost: AtomicBool,
    profile: RwLock<SignalProfile>,
}

impl GeneratorControls {
    fn new(profile: SignalProfile) -> Self {
        Self {
            boost: AtomicBool::new(false),
            profile: RwLock::new(profile),
        }
    }

    /// Toggle the activation boost (the monitor's "recording" state)
    pub fn set_boost(&self, enabled: bool) {
        self.boost.store(enabled, Ordering::Relaxed);
    }

    /// Whether the boost is on
    pub fn boost(&self) -> bool {
        self.boost.load(Ordering::Relaxed)
    }

    /// Switch signal shape without restarting the source
    pub fn set_profile(&self, profile: SignalProfile) {
        *self.profile.write() = profile;
        debug!(?profile, "simulator profile changed");
    }

    /// Current signal shape
    pub fn profile(&self) -> SignalProfile {
        *self.profile.read()
    }
}

/// Pure value generator behind [`SyntheticSource`]
pub struct SignalGenerator {
    rng: StdRng,
    controls: Arc<GeneratorControls>,
    interval_ms: u64,
    sequence: u64,
}

impl SignalGenerator {
    /// Generator seeded from `config`
    pub fn new(config: &SimulatorConfig) -> Result<Self, SimulatorError> {
        config.validate()?;
        Ok(Self::with_controls(
            config,
            Arc::new(GeneratorControls::new(config.profile)),
        ))
    }

    fn with_controls(config: &SimulatorConfig, controls: Arc<GeneratorControls>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            controls,
            interval_ms: config.interval_ms,
            sequence: 0,
        }
    }

    /// Boost and profile controls
    pub fn controls(&self) -> Arc<GeneratorControls> {
        self.controls.clone()
    }

    /// Value for the next tick
    pub fn next_value(&mut self) -> u16 {
        let elapsed_ms = (self.sequence * self.interval_ms) as f64;
        self.sequence += 1;

        let waveform = self.controls.profile().waveform();
        let noise = if waveform.noise_high > waveform.noise_low {
            self.rng.gen_range(waveform.noise_low..waveform.noise_high)
        } else {
            0.0
        };

        clamp_to_adc(waveform.deterministic_value(elapsed_ms, self.controls.boost()) + noise)
    }

    /// Next value stamped with `timestamp`
    pub fn next_sample(&mut self, timestamp: u64) -> RawSample {
        RawSample::new(self.next_value(), timestamp)
    }

    /// Ticks generated so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Synthetic [`SampleSource`] driven by a worker thread
pub struct SyntheticSource {
    config: SimulatorConfig,
    controls: Arc<GeneratorControls>,
    clock: SharedClock,
    name: String,
    running: Arc<AtomicBool>,
}

impl SyntheticSource {
    /// Source on the wall clock
    pub fn new(config: SimulatorConfig) -> Result<Self, SimulatorError> {
        Self::with_clock(config, system_clock())
    }

    /// Source stamping samples with `clock`
    pub fn with_clock(config: SimulatorConfig, clock: SharedClock) -> Result<Self, SimulatorError> {
        config.validate()?;
        let controls = Arc::new(GeneratorControls::new(config.profile));
        let name = format!("synthetic-{:?}", config.profile).to_lowercase();
        Ok(Self {
            config,
            controls,
            clock,
            name,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Boost and profile controls, usable while running
    pub fn controls(&self) -> Arc<GeneratorControls> {
        self.controls.clone()
    }

    /// Configuration the source was built from
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

impl SampleSource for SyntheticSource {
    fn start(&mut self, on_event: EventCallback) -> PipelineResult<SourceHandle> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SimulatorError::AlreadyRunning.into());
        }

        let mut generator = SignalGenerator::with_controls(&self.config, self.controls.clone());
        let clock = self.clock.clone();
        let running = self.running.clone();
        let interval = self.interval();

        let spawned = spawn_worker(&self.name, move |ctx| {
            run_periodic(
                ctx,
                interval,
                move || Some(SourceEvent::Sample(generator.next_sample(clock.now_millis()))),
                on_event,
            );
            running.store(false, Ordering::SeqCst);
        });

        if spawned.is_err() {
            self.running.store(false, Ordering::SeqCst);
        }
        spawned
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.interval_ms)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
