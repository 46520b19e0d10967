// src/processing/bus.rs
//! Per-processor publish/subscribe for readings
//!
//! Subscribers are either callbacks or bounded crossbeam channels. The
//! subscriber list is taken out of the lock while readings are dispatched,
//! so a callback may subscribe or unsubscribe without deadlocking. A
//! callback must not call back into the processor that is publishing.

use crate::processing::reading::Reading;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Callback invoked with every published reading
pub type ReadingCallback = Box<dyn FnMut(&Reading) + Send + 'static>;

enum Subscriber {
    Callback(ReadingCallback),
    Channel(Sender<Reading>),
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<(u64, Subscriber)>,
    dispatching: bool,
    removed_while_dispatching: Vec<u64>,
}

impl BusInner {
    fn add(&mut self, subscriber: Subscriber) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    /// The removed subscriber is returned so it is dropped outside the lock
    fn remove(&mut self, id: u64) -> Option<Subscriber> {
        if let Some(pos) = self.subscribers.iter().position(|(sid, _)| *sid == id) {
            return Some(self.subscribers.remove(pos).1);
        }
        if self.dispatching {
            self.removed_while_dispatching.push(id);
        }
        None
    }
}

/// Fan-out of readings to subscribers
#[derive(Default)]
pub struct ReadingBus {
    inner: Arc<Mutex<BusInner>>,
}

impl ReadingBus {
    /// Bus without subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. It stays registered while the returned
    /// [`Subscription`] lives.
    pub fn subscribe(&self, callback: ReadingCallback) -> Subscription {
        let id = self.inner.lock().add(Subscriber::Callback(callback));
        self.subscription(id)
    }

    /// Register a bounded channel subscriber. When the channel is full the
    /// reading is dropped for that subscriber; a dropped receiver
    /// unsubscribes it.
    pub fn subscribe_channel(&self, capacity: usize) -> (Subscription, Receiver<Reading>) {
        let (tx, rx) = channel::bounded(capacity.max(1));
        let id = self.inner.lock().add(Subscriber::Channel(tx));
        (self.subscription(id), rx)
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Deliver a reading to every subscriber in subscription order. If a
    /// callback panics the panic propagates, but every subscriber stays
    /// registered.
    pub fn publish(&self, reading: &Reading) {
        let mut dispatch = {
            let mut inner = self.inner.lock();
            if inner.subscribers.is_empty() {
                return;
            }
            inner.dispatching = true;
            Dispatch {
                inner: &self.inner,
                active: std::mem::take(&mut inner.subscribers),
                disconnected: Vec::new(),
            }
        };

        for (id, subscriber) in dispatch.active.iter_mut() {
            match subscriber {
                Subscriber::Callback(callback) => callback(reading),
                Subscriber::Channel(tx) => match tx.try_send(*reading) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(subscriber = *id, "subscriber channel full, dropping reading");
                    }
                    Err(TrySendError::Disconnected(_)) => dispatch.disconnected.push(*id),
                },
            }
        }

        if !dispatch.disconnected.is_empty() {
            debug!(count = dispatch.disconnected.len(), "removing disconnected channel subscribers");
        }
    }

    fn subscription(&self, id: u64) -> Subscription {
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            attached: true,
        }
    }
}

/// Subscribers taken out of the lock for one publish. Dropping it puts them
/// back, minus those removed or disconnected meanwhile; this also runs while
/// unwinding from a panicking callback.
struct Dispatch<'a> {
    inner: &'a Mutex<BusInner>,
    active: Vec<(u64, Subscriber)>,
    disconnected: Vec<u64>,
}

impl Drop for Dispatch<'_> {
    fn drop(&mut self) {
        let discarded: Vec<(u64, Subscriber)>;
        {
            let mut inner = self.inner.lock();
            inner.dispatching = false;
            let removed = std::mem::take(&mut inner.removed_while_dispatching);
            let disconnected = &self.disconnected;
            let (mut keep, gone): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
                .into_iter()
                .partition(|(id, _)| !removed.contains(id) && !disconnected.contains(id));
            keep.append(&mut inner.subscribers);
            inner.subscribers = keep;
            discarded = gone;
        }
        drop(discarded);
    }
}

/// Handle to a bus subscription; dropping it unsubscribes
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    bus: Weak<Mutex<BusInner>>,
    attached: bool,
}

impl Subscription {
    /// Remove the subscriber now
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    /// Keep the subscriber registered for the lifetime of the bus
    pub fn detach(mut self) {
        self.attached = false;
    }

    fn remove(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        if let Some(inner) = self.bus.upgrade() {
            let removed = inner.lock().remove(self.id);
            drop(removed);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.attached)
            .finish()
    }
}
