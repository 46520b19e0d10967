// src/hal/mod.rs
//! Sample sources feeding the pipeline

pub mod simulator;
pub mod traits;
pub mod transport;
pub mod types;
mod worker;

#[cfg(feature = "async")]
pub mod async_source;

pub use simulator::{GeneratorControls, SignalGenerator, SignalProfile, SimulatorConfig, SyntheticSource};
pub use traits::*;
pub use transport::{TransportFeed, TransportSource};
pub use types::*;
pub use worker::SourceHandle;

#[cfg(feature = "async")]
pub use async_source::{AsyncSourceHandle, IntervalSource};
