// src/processing/stats.rs
//! Session statistics

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a processor is in the monitor's session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Live monitoring, stats update
    #[default]
    Idle,
    /// Recording a session
    Active,
    /// Session ended; stats are frozen until reset
    Stopped,
}

/// Snapshot of the statistics shown by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Latest raw value
    pub current: u16,
    /// Highest raw value this session
    pub peak: u16,
    /// Mean of every raw value since the last reset
    pub average: f64,
    /// Sampling interval summed per reading
    pub duration_seconds: f64,
}

impl SessionStats {
    /// Average rounded to a whole count, as displayed
    pub fn rounded_average(&self) -> u16 {
        self.average.round() as u16
    }
}

/// Incremental accumulator behind [`SessionStats`]
///
/// The mean is kept as an exact integer sum over count, so it matches the
/// batch average of the same values.
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    current: u16,
    peak: u16,
    sum: u64,
    count: u64,
    duration: Duration,
}

impl RunningStats {
    /// Empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Account one value sampled `interval` after the previous one
    pub fn record(&mut self, value: u16, interval: Duration) {
        self.current = value;
        self.peak = self.peak.max(value);
        self.sum += u64::from(value);
        self.count += 1;
        self.duration += interval;
    }

    /// Session start: peak and duration restart, the average carries on
    pub fn restart_session(&mut self) {
        self.peak = 0;
        self.duration = Duration::ZERO;
    }

    /// Zero everything
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Exact mean of every recorded value
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    /// Values recorded
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Current values as [`SessionStats`]
    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            current: self.current,
            peak: self.peak,
            average: self.mean(),
            duration_seconds: self.duration.as_secs_f64(),
        }
    }
}
