// src/hal/traits.rs
//! Sample source abstraction

use crate::error::PipelineResult;
use crate::hal::types::SourceEvent;
use crate::hal::worker::SourceHandle;
use std::time::Duration;

/// Callback receiving source events on the source's worker thread
pub type EventCallback = Box<dyn FnMut(SourceEvent) + Send + 'static>;

/// Anything that can feed raw samples into the pipeline at a fixed cadence
///
/// Implementations must deliver values in 0..=1023 (clamping is the
/// source's job) and must report a lost transport with
/// [`SourceEvent::Disconnected`] rather than going quiet.
pub trait SampleSource: Send {
    /// Begin producing events. The returned handle cancels the stream.
    fn start(&mut self, on_event: EventCallback) -> PipelineResult<SourceHandle>;

    /// Stop producing events. Idempotent; once this returns the callback
    /// is never invoked again.
    fn stop(&mut self, handle: &mut SourceHandle) {
        handle.stop();
    }

    /// Nominal interval between samples
    fn interval(&self) -> Duration;

    /// Short identifier used in logs and thread names
    fn name(&self) -> &str;
}
