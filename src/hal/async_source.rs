// src/hal/async_source.rs
//! Tokio-driven synthetic source
//!
//! Same event contract as the threaded sources, but ticks on a
//! `tokio::time::interval` and delivers into an mpsc channel so an async
//! task can consume readings.

use crate::error::{PipelineError, PipelineResult};
use crate::hal::simulator::{GeneratorControls, SignalGenerator, SimulatorConfig, SimulatorError};
use crate::hal::types::SourceEvent;
use crate::utils::time::{system_clock, SharedClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Handle to a running [`IntervalSource`] task
#[derive(Debug)]
pub struct AsyncSourceHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl AsyncSourceHandle {
    /// Stop the task and wait for it to finish. No event is sent after
    /// this returns.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "async source task failed");
            }
        }
    }

    /// Whether the task is still ticking
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for AsyncSourceHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Synthetic source ticking on the tokio timer
pub struct IntervalSource {
    generator: Option<SignalGenerator>,
    controls: Arc<GeneratorControls>,
    interval: Duration,
    clock: SharedClock,
}

impl IntervalSource {
    /// Source on the wall clock
    pub fn new(config: &SimulatorConfig) -> Result<Self, SimulatorError> {
        Self::with_clock(config, system_clock())
    }

    /// Source stamping samples with `clock`
    pub fn with_clock(config: &SimulatorConfig, clock: SharedClock) -> Result<Self, SimulatorError> {
        let generator = SignalGenerator::new(config)?;
        Ok(Self {
            controls: generator.controls(),
            generator: Some(generator),
            interval: Duration::from_millis(config.interval_ms),
            clock,
        })
    }

    /// Boost and profile controls, usable while running
    pub fn controls(&self) -> Arc<GeneratorControls> {
        self.controls.clone()
    }

    /// Tick period
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the ticking task on the current runtime. Ends when stopped or
    /// when the receiver is dropped.
    pub fn start(&mut self, tx: mpsc::Sender<SourceEvent>) -> PipelineResult<AsyncSourceHandle> {
        let mut generator = self
            .generator
            .take()
            .ok_or(PipelineError::Simulator(SimulatorError::AlreadyRunning))?;
        let clock = self.clock.clone();
        let period = self.interval;
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let event = SourceEvent::Sample(generator.next_sample(clock.now_millis()));
                        tokio::select! {
                            _ = &mut stop_rx => break,
                            sent = tx.send(event) => {
                                if sent.is_err() {
                                    debug!("async source receiver dropped");
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            debug!(ticks = generator.sequence(), "async source stopped");
        });

        Ok(AsyncSourceHandle {
            stop_tx: Some(stop_tx),
            task: Some(task),
        })
    }
}
