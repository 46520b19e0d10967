// src/hal/types.rs
//! Core types exchanged between sample sources and the processor

use crate::utils::conversion::clamp_to_adc;
use serde::{Deserialize, Serialize};

/// Single raw ADC sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    /// Raw ADC value
    pub value: u16,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl RawSample {
    /// Sample of `value` taken at `timestamp`
    pub fn new(value: u16, timestamp: u64) -> Self {
        Self { value, timestamp }
    }
}

/// Event delivered by a sample source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// A new sample in range 0..=1023
    Sample(RawSample),
    /// Terminal: the underlying transport went away. No events follow.
    Disconnected {
        /// Why the transport went away
        reason: String,
    },
}

impl SourceEvent {
    /// No further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, SourceEvent::Disconnected { .. })
    }
}

/// Reading as delivered by a sensor transport
///
/// Frames arrive as JSON objects with camelCase keys. The transport's own
/// timestamp is kept verbatim; the pipeline stamps samples on receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportReading {
    /// Sending device
    pub device_id: String,
    /// Muscle id the reading belongs to
    pub muscle_group: String,
    /// Raw value as sent; may be fractional or out of range
    pub emg_value: f64,
    /// Voltage as computed by the device
    pub voltage: f64,
    /// ISO-8601 time stamped by the device
    pub timestamp: String,
    /// Recording session the reading belongs to
    pub session_id: String,
    /// User wearing the sensor
    pub user_id: String,
}

impl TransportReading {
    /// Decode a JSON frame
    pub fn from_json(frame: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(frame)
    }

    /// Raw sample for this reading, clamped into ADC range
    pub fn to_raw_sample(&self, received_at: u64) -> RawSample {
        RawSample::new(clamp_to_adc(self.emg_value), received_at)
    }
}
