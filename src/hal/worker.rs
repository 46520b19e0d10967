// src/hal/worker.rs
//! Worker threads that drive sample sources, and their cancellation handle

use crate::error::{PipelineError, PipelineResult};
use crate::hal::traits::EventCallback;
use crate::hal::types::SourceEvent;
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Cancellation handle returned by [`SampleSource::start`](crate::hal::SampleSource::start)
///
/// Stopping joins the worker thread, so no callback runs after `stop`
/// returns. A stop issued from inside the callback only flags the worker;
/// the worker exits as soon as the callback returns. Dropping the handle
/// stops the source.
pub struct SourceHandle {
    name: String,
    cancelled: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl SourceHandle {
    /// Stop the worker and wait for it. Idempotent.
    pub fn stop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.stop_tx.take();

        let Some(worker) = self.worker.take() else {
            return;
        };

        if worker.thread().id() == thread::current().id() {
            debug!(source = %self.name, "stop requested from inside source callback");
            return;
        }

        if worker.join().is_err() {
            warn!(source = %self.name, "source worker panicked");
        }
        debug!(source = %self.name, "sample source stopped");
    }

    /// Whether the worker is still delivering events
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Name of the source driven by this worker
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHandle")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// State handed to a worker body
pub(crate) struct WorkerContext {
    cancelled: Arc<AtomicBool>,
    stop_rx: Receiver<()>,
}

impl WorkerContext {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Closes when the handle is stopped
    pub(crate) fn stop_signal(&self) -> &Receiver<()> {
        &self.stop_rx
    }
}

pub(crate) fn spawn_worker<F>(name: &str, body: F) -> PipelineResult<SourceHandle>
where
    F: FnOnce(WorkerContext) + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let (stop_tx, stop_rx) = channel::bounded::<()>(1);
    let ctx = WorkerContext {
        cancelled: cancelled.clone(),
        stop_rx,
    };

    let worker = thread::Builder::new()
        .name(format!("emg-source-{name}"))
        .spawn(move || body(ctx))
        .map_err(|e| PipelineError::source(format!("failed to spawn {name} worker: {e}")))?;

    debug!(source = name, "sample source started");

    Ok(SourceHandle {
        name: name.to_string(),
        cancelled,
        stop_tx: Some(stop_tx),
        worker: Some(worker),
    })
}

/// Tick at a fixed interval, pulling one event per tick from `next`
pub(crate) fn run_periodic<F>(
    ctx: WorkerContext,
    interval: Duration,
    mut next: F,
    mut on_event: EventCallback,
) where
    F: FnMut() -> Option<SourceEvent>,
{
    let ticker = channel::tick(interval);

    loop {
        select! {
            recv(ctx.stop_signal()) -> _ => break,
            recv(ticker) -> _ => {
                if ctx.is_cancelled() {
                    break;
                }
                if let Some(event) = next() {
                    let terminal = event.is_terminal();
                    on_event(event);
                    if terminal || ctx.is_cancelled() {
                        break;
                    }
                }
            }
        }
    }
}
