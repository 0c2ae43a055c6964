// Event ingestor: runs a feed subscription on a dedicated thread and routes
// events for the target process into the counter store.

use crate::counters::CounterStore;
use crate::error::IngestError;
use crate::feed::{EventFeed, EventSink, Subscription};
use crate::models::{NetworkEvent, ReporterStatus};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle state shared between a reporter and its ingestor thread.
pub(crate) struct SessionControl {
    inner: Mutex<ControlInner>,
    status: watch::Sender<ReporterStatus>,
}

#[derive(Default)]
struct ControlInner {
    disposed: bool,
    subscription: Option<Arc<dyn Subscription>>,
}

impl SessionControl {
    pub(crate) fn new() -> Self {
        let (status, _) = watch::channel(ReporterStatus::Starting);
        Self {
            inner: Mutex::new(ControlInner::default()),
            status,
        }
    }

    pub(crate) fn status(&self) -> ReporterStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<ReporterStatus> {
        self.status.subscribe()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Stores the open subscription. Returns false if disposal already
    /// happened, in which case the caller must close it.
    fn attach(&self, subscription: Arc<dyn Subscription>) -> bool {
        let mut inner = self.lock();
        if inner.disposed {
            return false;
        }
        inner.subscription = Some(subscription);
        self.status.send_if_modified(|s| {
            if *s == ReporterStatus::Starting {
                *s = ReporterStatus::Active;
                true
            } else {
                false
            }
        });
        true
    }

    fn fail(&self, reason: String) {
        let inner = self.lock();
        if inner.disposed {
            return;
        }
        self.status.send_replace(ReporterStatus::Failed { reason });
    }

    /// Marks the session disposed and closes the subscription if one is open.
    /// Returns false if it was already disposed. Never waits on the ingestor
    /// thread, so it is safe to call from inside an event callback.
    pub(crate) fn dispose(&self) -> bool {
        let subscription = {
            let mut inner = self.lock();
            if inner.disposed {
                return false;
            }
            inner.disposed = true;
            self.status.send_replace(ReporterStatus::Disposed);
            inner.subscription.take()
        };
        if let Some(subscription) = subscription
            && let Err(e) = subscription.close()
        {
            warn!(error = %e, operation = "close_subscription", "closing trace session failed");
        }
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ControlInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Sink that drops events for other processes and counts the rest.
pub(crate) fn route(target_process_id: u32, counters: Arc<CounterStore>) -> EventSink {
    Arc::new(move |event: NetworkEvent| {
        if event.process_id == target_process_id {
            counters.increment(event.direction, event.size);
        }
    })
}

pub(crate) struct Ingestor {
    pub feed: Box<dyn EventFeed>,
    pub session_name: String,
    pub target_process_id: u32,
    pub counters: Arc<CounterStore>,
    pub control: Arc<SessionControl>,
}

impl Ingestor {
    /// Starts the ingestor on its own thread and returns without waiting for
    /// the subscription to open.
    pub(crate) fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(format!("netperf-ingest-{}", self.target_process_id))
            .spawn(move || self.run())
    }

    fn run(self) {
        let span = tracing::info_span!(
            "ingestor",
            session = %self.session_name,
            target_pid = self.target_process_id
        );
        let _guard = span.enter();

        if self.control.is_disposed() {
            debug!("disposed before subscribing");
            return;
        }

        let sink = route(self.target_process_id, self.counters.clone());
        let subscription = match self.feed.subscribe(&self.session_name, sink) {
            Ok(s) => s,
            Err(e) => return self.fail(e),
        };

        // The first window starts when events can actually flow.
        self.counters.reset();
        if !self.control.attach(subscription.clone()) {
            debug!("disposed while subscribing; closing session");
            if let Err(e) = subscription.close() {
                warn!(error = %e, operation = "close_subscription", "closing trace session failed");
            }
            return;
        }

        info!("network trace subscription active");
        match subscription.process() {
            Ok(()) if self.control.is_disposed() => debug!("processing loop ended"),
            Ok(()) => self.fail(IngestError::Process(
                "trace session ended unexpectedly".into(),
            )),
            Err(e) => self.fail(e),
        }
    }

    fn fail(&self, e: IngestError) {
        // Partial counts from a broken session are never reported.
        self.counters.reset();
        error!(error = %e, operation = "ingest", "network tracing stopped; reporting zero throughput");
        self.control.fail(e.to_string());
    }
}
