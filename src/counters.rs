// Counter store: byte counters for the current measurement window plus the
// read-and-reset rate computation. One mutex guards the whole aggregate.

use crate::clock::Clock;
use crate::models::{Direction, NetworkPerformanceSnapshot};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::trace;

/// Default lower bound for a measurement window.
pub const DEFAULT_MIN_WINDOW: Duration = Duration::from_millis(1);

const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Debug)]
struct Window {
    received: u64,
    sent: u64,
    started: Instant,
}

pub struct CounterStore {
    window: Mutex<Window>,
    clock: Arc<dyn Clock>,
    min_window: Duration,
}

impl CounterStore {
    /// `min_window` is the shortest interval a rate is ever divided by. A zero
    /// value is raised to one nanosecond.
    pub fn new(clock: Arc<dyn Clock>, min_window: Duration) -> Self {
        let started = clock.now();
        Self {
            window: Mutex::new(Window {
                received: 0,
                sent: 0,
                started,
            }),
            clock,
            min_window: min_window.max(Duration::from_nanos(1)),
        }
    }

    pub fn min_window(&self) -> Duration {
        self.min_window
    }

    pub fn increment(&self, direction: Direction, size: u64) {
        let mut window = self.lock();
        match direction {
            Direction::Received => window.received = window.received.saturating_add(size),
            Direction::Sent => window.sent = window.sent.saturating_add(size),
        }
    }

    /// Computes the average rate since the window started, then starts a new
    /// window. Elapsed time is read under the lock so every increment lands
    /// in exactly one window.
    ///
    /// Windows shorter than `min_window` are treated as `min_window` long.
    pub fn read_and_reset(&self) -> NetworkPerformanceSnapshot {
        let mut window = self.lock();
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(window.started);
        let snapshot = NetworkPerformanceSnapshot {
            bytes_received_per_second: rate(window.received, elapsed, self.min_window),
            bytes_sent_per_second: rate(window.sent, elapsed, self.min_window),
        };
        trace!(
            received = window.received,
            sent = window.sent,
            elapsed_ms = elapsed.as_millis() as u64,
            "window closed"
        );
        window.received = 0;
        window.sent = 0;
        window.started = now;
        snapshot
    }

    /// Drops any accumulated bytes and restarts the window.
    pub fn reset(&self) {
        let mut window = self.lock();
        window.received = 0;
        window.sent = 0;
        window.started = self.clock.now();
    }

    /// Bytes accumulated so far in the current window, as `(received, sent)`.
    pub fn totals(&self) -> (u64, u64) {
        let window = self.lock();
        (window.received, window.sent)
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        // Every update is a plain field assignment, so a panicking holder
        // cannot leave the window half-written.
        self.window.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Bytes per second over `elapsed`, truncated toward zero and clamped to `i64`.
pub(crate) fn rate(bytes: u64, elapsed: Duration, min_window: Duration) -> i64 {
    let nanos = elapsed.max(min_window).as_nanos().max(1);
    let per_sec = u128::from(bytes) * NANOS_PER_SEC / nanos;
    i64::try_from(per_sec).unwrap_or(i64::MAX)
}
