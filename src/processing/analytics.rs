// src/processing/analytics.rs
//! Session comparison helpers used by the analytics views

use crate::utils::conversion::round_to;

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Percent change of the mean from `previous` to `current`, one decimal.
///
/// Returns 0 when either session is empty or the previous mean is zero.
pub fn muscle_progress(current: &[f64], previous: &[f64]) -> f64 {
    match (mean(current), mean(previous)) {
        (Some(current), Some(previous)) if previous != 0.0 => {
            round_to((current - previous) / previous * 100.0, 1)
        }
        _ => 0.0,
    }
}

/// `mm:ss`, minutes not capped at 59
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress() {
        assert_eq!(muscle_progress(&[110.0, 130.0], &[100.0, 100.0]), 20.0);
        assert_eq!(muscle_progress(&[90.0], &[120.0]), -25.0);
        assert_eq!(muscle_progress(&[1.0, 2.0], &[3.0]), -50.0);
        assert_eq!(muscle_progress(&[100.0], &[300.0]), -66.7);
    }

    #[test]
    fn test_progress_empty_sessions() {
        assert_eq!(muscle_progress(&[100.0], &[]), 0.0);
        assert_eq!(muscle_progress(&[], &[100.0]), 0.0);
        assert_eq!(muscle_progress(&[100.0], &[0.0]), 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(75), "01:15");
        assert_eq!(format_duration(3_600), "60:00");
    }
}
