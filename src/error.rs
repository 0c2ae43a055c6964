// Error types for the tracing feed and the public reporter API.

use thiserror::Error;

/// Failures inside the ingestion layer. Contained by the ingestor and
/// reported through `ReporterStatus::Failed`, never returned to callers of
/// the reporter.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("network tracing is not supported on this platform")]
    Unsupported,
    #[error("failed to attach to trace provider: {0}")]
    Subscribe(String),
    #[error("trace processing failed: {0}")]
    Process(String),
    #[error("subscription already closed")]
    Closed,
}

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("reporter has been disposed")]
    Disposed,
    #[error("failed to spawn ingestor thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("invalid reporter configuration: {0}")]
    InvalidConfig(String),
}
