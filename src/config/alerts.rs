// src/config/alerts.rs
//! Alert levels per user type

use crate::config::constants::alerts;
use serde::{Deserialize, Serialize};

/// Kind of user the thresholds are tuned for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Trained athlete, highest levels
    Athlete,
    /// Rehabilitation patient, lowest levels
    Patient,
    /// Fitness enthusiast
    #[default]
    Enthusiast,
}

impl UserType {
    /// Alert levels for this user type
    pub fn thresholds(self) -> AlertThresholds {
        let (fatigue, optimal, recovery) = match self {
            UserType::Athlete => alerts::ATHLETE,
            UserType::Patient => alerts::PATIENT,
            UserType::Enthusiast => alerts::ENTHUSIAST,
        };
        AlertThresholds {
            fatigue,
            optimal,
            recovery,
        }
    }
}

/// Raw ADC levels separating the alert zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// At or above: fatigue
    pub fatigue: u16,
    /// At or above: optimal training zone
    pub optimal: u16,
    /// At or below: recovery
    pub recovery: u16,
}

/// Training zone of a raw value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdZone {
    /// At or above the fatigue level
    Fatigue,
    /// At or above the optimal level
    Optimal,
    /// Between recovery and optimal
    Building,
    /// At or below the recovery level
    Recovery,
}

impl AlertThresholds {
    /// Zone of a raw value; fatigue and optimal edges are inclusive
    pub fn zone(&self, value: u16) -> ThresholdZone {
        if value >= self.fatigue {
            ThresholdZone::Fatigue
        } else if value >= self.optimal {
            ThresholdZone::Optimal
        } else if value <= self.recovery {
            ThresholdZone::Recovery
        } else {
            ThresholdZone::Building
        }
    }

    /// `fatigue > optimal > recovery`
    pub fn is_ordered(&self) -> bool {
        self.fatigue > self.optimal && self.optimal > self.recovery
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_type_levels() {
        assert_eq!(
            UserType::Athlete.thresholds(),
            AlertThresholds { fatigue: 800, optimal: 600, recovery: 200 }
        );
        assert_eq!(UserType::Patient.thresholds().optimal, 400);
        assert_eq!(UserType::Enthusiast.thresholds().recovery, 175);
    }

    #[test]
    fn test_zone_boundaries() {
        let t = UserType::Athlete.thresholds();
        assert_eq!(t.zone(800), ThresholdZone::Fatigue);
        assert_eq!(t.zone(799), ThresholdZone::Optimal);
        assert_eq!(t.zone(600), ThresholdZone::Optimal);
        assert_eq!(t.zone(599), ThresholdZone::Building);
        assert_eq!(t.zone(201), ThresholdZone::Building);
        assert_eq!(t.zone(200), ThresholdZone::Recovery);
        assert_eq!(t.zone(0), ThresholdZone::Recovery);
    }

    #[test]
    fn test_user_type_serde() {
        let parsed: UserType = serde_json::from_str("\"patient\"").unwrap();
        assert_eq!(parsed, UserType::Patient);
    }
}
