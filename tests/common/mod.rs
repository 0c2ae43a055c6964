// Shared test helpers

#![allow(dead_code)]

use netperf::clock::ManualClock;
use netperf::feed::{FeedInjector, ManualFeed};
use netperf::{NetworkPerformanceReporter, ReporterStatus};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Reporter on a manual feed and clock, already past subscription setup.
pub fn active_reporter(
    target_pid: u32,
) -> (NetworkPerformanceReporter, FeedInjector, Arc<ManualClock>) {
    let (feed, injector) = ManualFeed::new();
    let clock = Arc::new(ManualClock::new());
    let reporter = NetworkPerformanceReporter::builder()
        .target_process_id(target_pid)
        .feed(feed)
        .clock(clock.clone())
        .start()
        .expect("start reporter");
    wait_for_status(&reporter, |s| *s == ReporterStatus::Active);
    (reporter, injector, clock)
}

/// Polls until `pred` holds for the reporter status; panics after STATUS_TIMEOUT.
pub fn wait_for_status(
    reporter: &NetworkPerformanceReporter,
    pred: impl Fn(&ReporterStatus) -> bool,
) -> ReporterStatus {
    wait_until(|| pred(&reporter.status()), "reporter status");
    reporter.status()
}

pub fn wait_until(cond: impl Fn() -> bool, what: &str) {
    let deadline = Instant::now() + STATUS_TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        std::thread::sleep(Duration::from_millis(5));
    }
}
