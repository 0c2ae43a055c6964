// Public API: one reporter per target process. Construction starts the
// ingestor in the background; reads compute the rate for the window since
// the previous read and start a new one.

use crate::clock::{Clock, SystemClock};
use crate::config::ReporterConfig;
use crate::counters::{CounterStore, DEFAULT_MIN_WINDOW};
use crate::error::ReporterError;
use crate::feed::{self, EventFeed};
use crate::ingestor::{Ingestor, SessionControl};
use crate::models::{NetworkPerformanceSnapshot, ReporterStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, instrument};

/// Default prefix for generated trace session names.
pub const DEFAULT_SESSION_PREFIX: &str = "netperf";

/// Longest session name the OS tracing layer accepts.
const MAX_SESSION_NAME_LEN: usize = 1024;

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique within this process: `{prefix}-{pid}-{sequence}`.
fn generate_session_name(prefix: &str) -> String {
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}-{}", prefix, std::process::id(), seq)
}

/// Samples TCP/IP throughput of a single process.
///
/// The trace session is closed by [`close`](Self::close) or on drop.
pub struct NetworkPerformanceReporter {
    target_process_id: u32,
    session_name: String,
    counters: Arc<CounterStore>,
    control: Arc<SessionControl>,
}

impl NetworkPerformanceReporter {
    /// Reporter for the current process on the platform's default feed.
    pub fn create() -> Result<Self, ReporterError> {
        Self::builder().start()
    }

    /// Reporter for `target_process_id` on the platform's default feed.
    pub fn create_for(target_process_id: u32) -> Result<Self, ReporterError> {
        Self::builder().target_process_id(target_process_id).start()
    }

    pub fn builder() -> ReporterBuilder {
        ReporterBuilder::default()
    }

    pub fn target_process_id(&self) -> u32 {
        self.target_process_id
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Average bytes/second received and sent since the previous call (or
    /// since construction), truncated toward zero. Starts a new window.
    ///
    /// Reads closer together than the configured minimum window are divided
    /// by that minimum instead of the real interval. After a feed failure
    /// this keeps returning zero rates; see [`status`](Self::status).
    pub fn read_and_reset(&self) -> Result<NetworkPerformanceSnapshot, ReporterError> {
        if self.control.is_disposed() {
            return Err(ReporterError::Disposed);
        }
        Ok(self.counters.read_and_reset())
    }

    pub fn status(&self) -> ReporterStatus {
        self.control.status()
    }

    /// Receiver that observes every lifecycle transition.
    pub fn watch_status(&self) -> watch::Receiver<ReporterStatus> {
        self.control.watch()
    }

    /// Closes the trace session. Idempotent and non-blocking; safe to call
    /// from any thread, including from inside event delivery.
    #[instrument(skip(self), fields(session = %self.session_name))]
    pub fn close(&self) {
        if self.control.dispose() {
            debug!("reporter closed");
        }
    }
}

impl Drop for NetworkPerformanceReporter {
    fn drop(&mut self) {
        self.close();
    }
}

/// Configures and starts a [`NetworkPerformanceReporter`].
pub struct ReporterBuilder {
    target_process_id: Option<u32>,
    feed: Option<Box<dyn EventFeed>>,
    clock: Option<Arc<dyn Clock>>,
    session_name: Option<String>,
    session_prefix: String,
    min_window: Duration,
}

impl Default for ReporterBuilder {
    fn default() -> Self {
        Self {
            target_process_id: None,
            feed: None,
            clock: None,
            session_name: None,
            session_prefix: DEFAULT_SESSION_PREFIX.to_string(),
            min_window: DEFAULT_MIN_WINDOW,
        }
    }
}

impl ReporterBuilder {
    pub fn from_config(config: &ReporterConfig) -> Self {
        Self::default()
            .session_prefix(config.session_prefix.clone())
            .min_window(Duration::from_millis(config.min_window_ms))
    }

    /// Defaults to the current process.
    pub fn target_process_id(mut self, pid: u32) -> Self {
        self.target_process_id = Some(pid);
        self
    }

    /// Defaults to [`feed::default_feed`].
    pub fn feed(mut self, feed: impl EventFeed) -> Self {
        self.feed = Some(Box::new(feed));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Exact trace session name. Overrides the generated one.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    pub fn session_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.session_prefix = prefix.into();
        self
    }

    pub fn min_window(mut self, min_window: Duration) -> Self {
        self.min_window = min_window;
        self
    }

    /// Starts the ingestor thread and returns at once; the subscription opens
    /// in the background.
    pub fn start(self) -> Result<NetworkPerformanceReporter, ReporterError> {
        let session_name = match self.session_name {
            Some(name) => name,
            None => generate_session_name(&self.session_prefix),
        };
        if session_name.trim().is_empty() {
            return Err(ReporterError::InvalidConfig(
                "session name must be non-empty".into(),
            ));
        }
        if session_name.len() > MAX_SESSION_NAME_LEN {
            return Err(ReporterError::InvalidConfig(format!(
                "session name longer than {MAX_SESSION_NAME_LEN} bytes"
            )));
        }
        if self.min_window.is_zero() {
            return Err(ReporterError::InvalidConfig(
                "min window must be > 0".into(),
            ));
        }

        let target_process_id = self.target_process_id.unwrap_or_else(std::process::id);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let counters = Arc::new(CounterStore::new(clock, self.min_window));
        let control = Arc::new(SessionControl::new());

        Ingestor {
            feed: self.feed.unwrap_or_else(feed::default_feed),
            session_name: session_name.clone(),
            target_process_id,
            counters: counters.clone(),
            control: control.clone(),
        }
        .spawn()?;

        debug!(
            session = %session_name,
            target_pid = target_process_id,
            "reporter started"
        );
        Ok(NetworkPerformanceReporter {
            target_process_id,
            session_name,
            counters,
            control,
        })
    }
}
