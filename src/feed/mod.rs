// Boundary to the OS network-tracing source. The ingestor only sees these
// traits; platform backends live in submodules.

#[cfg(windows)]
pub mod etw;
pub mod manual;

use crate::error::IngestError;
use crate::models::NetworkEvent;
use std::sync::Arc;

pub use manual::{FeedInjector, ManualFeed};

/// Receives every decoded event, on the thread running `Subscription::process`.
pub type EventSink = Arc<dyn Fn(NetworkEvent) + Send + Sync>;

/// A push-based source of TCP/IP send/receive events.
pub trait EventFeed: Send + 'static {
    /// Attaches to the source under `session_name`. Events are delivered to
    /// `sink` only while `process` is running.
    fn subscribe(
        &self,
        session_name: &str,
        sink: EventSink,
    ) -> Result<Arc<dyn Subscription>, IngestError>;
}

/// An open session on an `EventFeed`.
pub trait Subscription: Send + Sync {
    /// Blocks delivering events until the subscription is closed.
    fn process(&self) -> Result<(), IngestError>;

    /// Closes the session, making `process` return. Calling it more than once,
    /// or before `process` starts, is fine.
    fn close(&self) -> Result<(), IngestError>;
}

/// Feed used where no tracing backend exists; every subscription fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedFeed;

impl EventFeed for UnsupportedFeed {
    fn subscribe(
        &self,
        _session_name: &str,
        _sink: EventSink,
    ) -> Result<Arc<dyn Subscription>, IngestError> {
        Err(IngestError::Unsupported)
    }
}

/// Kernel TCP/IP tracing on Windows.
#[cfg(windows)]
pub fn default_feed() -> Box<dyn EventFeed> {
    Box::new(etw::EtwFeed)
}

#[cfg(not(windows))]
pub fn default_feed() -> Box<dyn EventFeed> {
    Box::new(UnsupportedFeed)
}
