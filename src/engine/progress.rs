//! Progress reporting and cooperative cancellation primitives shared
//! between the session worker and the presentation layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives whole-percent progress ticks (0-100) from the active session.
///
/// Implementations must tolerate being called from the session worker
/// thread. Ticks are throttled to value changes, never per byte.
pub trait ProgressSink: Send + Sync {
    fn update(&self, percent: u8);
}

/// Sink that discards every tick.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn update(&self, _percent: u8) {}
}

/// Cooperative cancellation flag shared between the controller and the
/// worker. The worker only ever reads it; requesting cancellation is
/// advisory until the next checked boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Converts cumulative processed bytes into throttled percent ticks,
/// optionally scaled into a sub-window of 0-100 for multi-stage operations.
///
/// The total is computed up front by the caller, so the reported value is
/// monotonic and reaches the window's upper bound exactly once.
pub struct ProgressMeter<'a> {
    sink: &'a dyn ProgressSink,
    total: u64,
    done: u64,
    low: u8,
    high: u8,
    last: Option<u8>,
}

impl<'a> ProgressMeter<'a> {
    pub fn new(sink: &'a dyn ProgressSink, total: u64) -> Self {
        Self::scaled(sink, total, 0, 100)
    }

    /// Meter reporting into the `low..=high` window.
    pub fn scaled(sink: &'a dyn ProgressSink, total: u64, low: u8, high: u8) -> Self {
        let mut meter = Self {
            sink,
            total,
            done: 0,
            low,
            high,
            last: None,
        };
        meter.emit();
        meter
    }

    /// Records `bytes` more processed bytes.
    pub fn add(&mut self, bytes: u64) {
        self.set(self.done.saturating_add(bytes));
    }

    /// Sets the absolute processed amount (used when an external tool
    /// reports its own percentage with `total == 100`).
    pub fn set(&mut self, done: u64) {
        self.done = done.min(self.total);
        self.emit();
    }

    /// Forces the window's upper bound, for stages whose byte total is zero.
    pub fn finish(&mut self) {
        self.done = self.total;
        if self.last != Some(self.high) {
            self.last = Some(self.high);
            self.sink.update(self.high);
        }
    }

    fn emit(&mut self) {
        let span = u64::from(self.high - self.low);
        let percent = if self.total == 0 {
            self.low
        } else {
            self.low + (self.done.saturating_mul(span) / self.total) as u8
        };
        if self.last != Some(percent) {
            self.last = Some(percent);
            self.sink.update(percent);
        }
    }
}
