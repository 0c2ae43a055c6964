// Domain models: decoded trace events, throughput snapshots, reporter status.

use serde::{Deserialize, Serialize};

/// Which TCP/IP event category a byte count belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Received,
    Sent,
}

/// One event decoded from an OS network-tracing feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkEvent {
    pub process_id: u32,
    pub size: u64,
    pub direction: Direction,
}

impl NetworkEvent {
    pub fn received(process_id: u32, size: u64) -> Self {
        Self {
            process_id,
            size,
            direction: Direction::Received,
        }
    }

    pub fn sent(process_id: u32, size: u64) -> Self {
        Self {
            process_id,
            size,
            direction: Direction::Sent,
        }
    }
}

/// Throughput averaged over one measurement window.
///
/// Rates are bytes per second, truncated toward zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkPerformanceSnapshot {
    pub bytes_received_per_second: i64,
    pub bytes_sent_per_second: i64,
}

/// Observable lifecycle of a reporter; serializes with a lowercase `state` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ReporterStatus {
    /// Subscription setup is in flight on the ingestor thread.
    Starting,
    /// Events are flowing into the counters.
    Active,
    /// The subscription failed; counters stay at zero from here on.
    Failed { reason: String },
    /// Terminal.
    Disposed,
}

impl ReporterStatus {
    pub fn is_disposed(&self) -> bool {
        matches!(self, ReporterStatus::Disposed)
    }
}
