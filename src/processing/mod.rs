// src/processing/mod.rs
//! Sample processing: smoothing, classification, history and statistics

pub mod analytics;
pub mod bus;
pub mod history;
pub mod processor;
pub mod reading;
pub mod smoothing;
pub mod stats;

pub use analytics::{format_duration, muscle_progress};
pub use bus::{ReadingBus, ReadingCallback, Subscription};
pub use history::HistoryBuffer;
pub use processor::{LinkState, SampleProcessor};
pub use reading::{Activation, ActivationLevel, Reading};
pub use smoothing::Smoother;
pub use stats::{RunningStats, SessionState, SessionStats};
