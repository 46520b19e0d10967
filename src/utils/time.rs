// src/utils/time.rs
//! Clock abstraction so hold windows and timestamps can be driven by tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

/// Shared handle to a clock
pub type SharedClock = Arc<dyn TimeProvider>;

/// System time provider using the wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> u64 {
        current_timestamp_millis()
    }
}

/// Mock time provider for deterministic testing
#[derive(Debug)]
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    /// Clock frozen at `initial_time_millis`
    pub fn new(initial_time_millis: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_millis),
        }
    }

    /// Move the clock forward
    pub fn advance_by(&self, millis: u64) {
        self.current_time.fetch_add(millis, Ordering::Relaxed);
    }

    /// Jump to an absolute time
    pub fn set_time(&self, millis: u64) {
        self.current_time.store(millis, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_millis(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }
}

/// Wall clock shared handle
pub fn system_clock() -> SharedClock {
    Arc::new(SystemTimeProvider)
}

/// Wall-clock milliseconds since the Unix epoch
pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
