// src/processing/smoothing.rs
//! Trailing-window smoothing of raw ADC counts

use crate::config::{SmoothingConfig, SmoothingKind};
use std::collections::VecDeque;

/// Smoothing state for one stream
#[derive(Debug, Clone)]
pub enum Smoother {
    /// Simple moving average over the last `window` samples
    Moving {
        /// Samples averaged
        window: usize,
        /// Trailing samples, oldest first
        samples: VecDeque<f64>,
        /// Running sum of `samples`
        sum: f64,
    },
    /// Exponential moving average, seeded with the first sample
    Exponential {
        /// Weight of the newest sample
        alpha: f64,
        /// Last smoothed value
        state: Option<f64>,
    },
    /// No smoothing
    Passthrough,
}

impl Smoother {
    /// Moving average; a zero window is raised to one
    pub fn moving_average(window: usize) -> Self {
        let window = window.max(1);
        Smoother::Moving {
            window,
            samples: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    /// `alpha` is clamped into `(0, 1]`
    pub fn exponential(alpha: f64) -> Self {
        Smoother::Exponential {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            state: None,
        }
    }

    /// Smoother matching a configuration
    pub fn from_config(config: &SmoothingConfig) -> Self {
        match config.method {
            SmoothingKind::Moving => Self::moving_average(config.window),
            SmoothingKind::Exponential => Self::exponential(config.alpha),
            SmoothingKind::Passthrough => Smoother::Passthrough,
        }
    }

    /// Feed one sample and return the smoothed value
    pub fn update(&mut self, value: f64) -> f64 {
        match self {
            Smoother::Moving { window, samples, sum } => {
                if samples.len() == *window {
                    if let Some(oldest) = samples.pop_front() {
                        *sum -= oldest;
                    }
                }
                samples.push_back(value);
                *sum += value;
                *sum / samples.len() as f64
            }
            Smoother::Exponential { alpha, state } => {
                let next = match *state {
                    Some(previous) => *alpha * value + (1.0 - *alpha) * previous,
                    None => value,
                };
                *state = Some(next);
                next
            }
            Smoother::Passthrough => value,
        }
    }

    /// Forget previous samples
    pub fn reset(&mut self) {
        match self {
            Smoother::Moving { samples, sum, .. } => {
                samples.clear();
                *sum = 0.0;
            }
            Smoother::Exponential { state, .. } => *state = None,
            Smoother::Passthrough => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_window() {
        let mut smoother = Smoother::moving_average(3);
        assert_eq!(smoother.update(3.0), 3.0);
        assert_eq!(smoother.update(6.0), 4.5);
        assert_eq!(smoother.update(9.0), 6.0);
        assert_eq!(smoother.update(12.0), 9.0);
    }

    #[test]
    fn test_exponential_average() {
        let mut smoother = Smoother::exponential(0.5);
        assert_eq!(smoother.update(100.0), 100.0);
        assert_eq!(smoother.update(200.0), 150.0);
        assert_eq!(smoother.update(200.0), 175.0);
    }

    #[test]
    fn test_passthrough_and_reset() {
        let mut passthrough = Smoother::from_config(&SmoothingConfig {
            method: SmoothingKind::Passthrough,
            ..SmoothingConfig::default()
        });
        assert_eq!(passthrough.update(42.0), 42.0);

        let mut moving = Smoother::moving_average(4);
        moving.update(1000.0);
        moving.reset();
        assert_eq!(moving.update(10.0), 10.0);
    }

    #[test]
    fn test_zero_window_behaves_as_one() {
        let mut smoother = Smoother::moving_average(0);
        assert_eq!(smoother.update(5.0), 5.0);
        assert_eq!(smoother.update(7.0), 7.0);
    }
}
