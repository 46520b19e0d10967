// src/hal/transport.rs
//! Channel-backed source for readings pushed by an external sensor transport
//!
//! The transport itself (Bluetooth, serial) lives outside this crate. It
//! holds a [`TransportFeed`] and pushes decoded readings or raw JSON frames;
//! the source forwards them to the pipeline as [`SourceEvent`]s. Dropping
//! every feed, or calling [`TransportFeed::disconnect`], ends the stream
//! with a terminal `Disconnected` event once queued readings are delivered.

use crate::error::{PipelineError, PipelineResult};
use crate::hal::traits::{EventCallback, SampleSource};
use crate::hal::types::{SourceEvent, TransportReading};
use crate::hal::worker::{spawn_worker, SourceHandle};
use crate::utils::time::{system_clock, SharedClock};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use crossbeam::select;
use std::time::Duration;
use tracing::{debug, info, warn};

const FEED_CAPACITY: usize = 256;

enum TransportMessage {
    Reading(TransportReading),
    Frame(Vec<u8>),
}

/// Producer side handed to the transport implementation
#[derive(Clone)]
pub struct TransportFeed {
    tx: Sender<TransportMessage>,
    control: Sender<String>,
}

impl TransportFeed {
    /// Push a decoded reading. Returns `false` if the source is gone or
    /// its queue is full.
    pub fn push(&self, reading: TransportReading) -> bool {
        self.send(TransportMessage::Reading(reading))
    }

    /// Push a raw JSON frame as received from the sensor characteristic
    pub fn push_json(&self, frame: &[u8]) -> bool {
        self.send(TransportMessage::Frame(frame.to_vec()))
    }

    /// Report that the link dropped. Never blocks: the reason travels on its
    /// own slot, so a full reading queue does not hold it back. Only the
    /// first reason is kept.
    pub fn disconnect(&self, reason: impl Into<String>) {
        match self.control.try_send(reason.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(reason)) => {
                debug!(%reason, "transport disconnect already pending");
            }
            Err(TrySendError::Disconnected(reason)) => {
                debug!(%reason, "transport source already gone");
            }
        }
    }

    fn send(&self, message: TransportMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("transport queue full, dropping reading");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// [`SampleSource`] fed by an external transport
pub struct TransportSource {
    name: String,
    muscle: Option<String>,
    nominal_interval: Duration,
    channels: Option<(Receiver<TransportMessage>, Receiver<String>)>,
    clock: SharedClock,
}

impl TransportSource {
    /// Create a source and the feed the transport writes into. When
    /// `muscle` is set, readings for other muscle groups are skipped.
    pub fn new(name: &str, muscle: Option<&str>, nominal_interval: Duration) -> (Self, TransportFeed) {
        Self::with_clock(name, muscle, nominal_interval, system_clock())
    }

    /// Same as [`new`](Self::new), stamping samples with `clock`
    pub fn with_clock(
        name: &str,
        muscle: Option<&str>,
        nominal_interval: Duration,
        clock: SharedClock,
    ) -> (Self, TransportFeed) {
        let (tx, rx) = channel::bounded(FEED_CAPACITY);
        let (control, control_rx) = channel::bounded(1);
        let source = Self {
            name: name.to_string(),
            muscle: muscle.map(str::to_string),
            nominal_interval,
            channels: Some((rx, control_rx)),
            clock,
        };
        (source, TransportFeed { tx, control })
    }
}

/// Decodes queued messages and hands matching readings to the callback
struct Forwarder {
    name: String,
    muscle: Option<String>,
    clock: SharedClock,
}

impl Forwarder {
    fn forward(&self, message: TransportMessage, on_event: &mut EventCallback) {
        let reading = match message {
            TransportMessage::Reading(reading) => reading,
            TransportMessage::Frame(frame) => match TransportReading::from_json(&frame) {
                Ok(reading) => reading,
                Err(e) => {
                    warn!(source = %self.name, error = %e, "failed to decode transport frame");
                    return;
                }
            },
        };

        if let Some(expected) = &self.muscle {
            if &reading.muscle_group != expected {
                debug!(source = %self.name, muscle = %reading.muscle_group, "skipping reading for other muscle");
                return;
            }
        }

        on_event(SourceEvent::Sample(reading.to_raw_sample(self.clock.now_millis())));
    }
}

impl SampleSource for TransportSource {
    fn start(&mut self, mut on_event: EventCallback) -> PipelineResult<SourceHandle> {
        let (rx, control) = self
            .channels
            .take()
            .ok_or_else(|| PipelineError::source(format!("transport source {} already started", self.name)))?;
        let forwarder = Forwarder {
            name: self.name.clone(),
            muscle: self.muscle.clone(),
            clock: self.clock.clone(),
        };

        spawn_worker(&self.name, move |ctx| {
            let reason = loop {
                select! {
                    recv(ctx.stop_signal()) -> _ => return,
                    recv(control) -> msg => break msg.ok(),
                    recv(rx) -> msg => match msg {
                        Ok(message) => forwarder.forward(message, &mut on_event),
                        Err(_) => break control.try_recv().ok(),
                    },
                }
                if ctx.is_cancelled() {
                    return;
                }
            };

            // readings queued ahead of the disconnect are still delivered
            for message in rx.try_iter() {
                if ctx.is_cancelled() {
                    return;
                }
                forwarder.forward(message, &mut on_event);
            }

            let reason = reason.unwrap_or_else(|| "transport feed closed".to_string());
            info!(source = %forwarder.name, %reason, "transport disconnected");
            on_event(SourceEvent::Disconnected { reason });
        })
    }

    fn interval(&self) -> Duration {
        self.nominal_interval
    }

    fn name(&self) -> &str {
        &self.name
    }
}
