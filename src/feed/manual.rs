// Channel-backed feed: events are pushed in by a `FeedInjector` instead of
// the OS. Used by tests and by hosts that already own an event source.

use super::{EventFeed, EventSink, Subscription};
use crate::error::IngestError;
use crate::models::NetworkEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

enum FeedMessage {
    Event(NetworkEvent),
    Fail(String),
    Flush(oneshot::Sender<()>),
    Close,
}

type Receiver = mpsc::UnboundedReceiver<FeedMessage>;

pub struct ManualFeed {
    tx: mpsc::UnboundedSender<FeedMessage>,
    rx: Mutex<Option<Receiver>>,
    subscribe_error: Option<String>,
}

/// Pushes events into a `ManualFeed`. Events sent before the subscription is
/// processing are buffered.
#[derive(Clone)]
pub struct FeedInjector {
    tx: mpsc::UnboundedSender<FeedMessage>,
}

impl ManualFeed {
    pub fn new() -> (Self, FeedInjector) {
        let (tx, rx) = mpsc::unbounded_channel();
        let feed = Self {
            tx: tx.clone(),
            rx: Mutex::new(Some(rx)),
            subscribe_error: None,
        };
        (feed, FeedInjector { tx })
    }

    /// A feed whose `subscribe` always fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        let (mut feed, _injector) = Self::new();
        feed.subscribe_error = Some(reason.into());
        feed
    }
}

impl EventFeed for ManualFeed {
    fn subscribe(
        &self,
        session_name: &str,
        sink: EventSink,
    ) -> Result<Arc<dyn Subscription>, IngestError> {
        if let Some(reason) = &self.subscribe_error {
            return Err(IngestError::Subscribe(reason.clone()));
        }
        let rx = self
            .rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| {
                IngestError::Subscribe(format!("{session_name}: feed already subscribed"))
            })?;
        Ok(Arc::new(ManualSubscription {
            tx: self.tx.clone(),
            rx: Mutex::new(Some(rx)),
            sink,
            closed: AtomicBool::new(false),
        }))
    }
}

impl FeedInjector {
    /// Returns false once the processing loop has ended.
    pub fn send(&self, event: NetworkEvent) -> bool {
        self.tx.send(FeedMessage::Event(event)).is_ok()
    }

    pub fn received(&self, process_id: u32, size: u64) -> bool {
        self.send(NetworkEvent::received(process_id, size))
    }

    pub fn sent(&self, process_id: u32, size: u64) -> bool {
        self.send(NetworkEvent::sent(process_id, size))
    }

    /// Makes the processing loop fail with `reason`, as a broken trace session would.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.tx.send(FeedMessage::Fail(reason.into())).is_ok()
    }

    /// Blocks until every event sent before this call has reached the sink.
    /// Returns false if the subscription stopped first. Must not be called
    /// from inside an async runtime.
    pub fn flush(&self) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(FeedMessage::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.blocking_recv().is_ok()
    }
}

struct ManualSubscription {
    tx: mpsc::UnboundedSender<FeedMessage>,
    rx: Mutex<Option<Receiver>>,
    sink: EventSink,
    closed: AtomicBool,
}

impl Subscription for ManualSubscription {
    fn process(&self) -> Result<(), IngestError> {
        let mut rx = self
            .rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(IngestError::Closed)?;
        while let Some(message) = rx.blocking_recv() {
            if self.closed.load(Ordering::Acquire) {
                break;
            }
            match message {
                FeedMessage::Event(event) => (self.sink)(event),
                FeedMessage::Fail(reason) => return Err(IngestError::Process(reason)),
                FeedMessage::Flush(ack) => {
                    let _ = ack.send(());
                }
                FeedMessage::Close => break,
            }
        }
        Ok(())
    }

    fn close(&self) -> Result<(), IngestError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(FeedMessage::Close);
        }
        Ok(())
    }
}
