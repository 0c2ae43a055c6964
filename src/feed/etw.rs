// Kernel TCP/IP events via Event Tracing for Windows (ferrisetw).
// Attaching to the kernel provider needs administrator rights.

use super::{EventFeed, EventSink, Subscription};
use crate::error::IngestError;
use crate::models::{Direction, NetworkEvent};
use ferrisetw::parser::Parser;
use ferrisetw::provider::Provider;
use ferrisetw::provider::kernel_providers::TCP_IP_PROVIDER;
use ferrisetw::trace::{KernelTrace, TraceTrait};
use ferrisetw::{EventRecord, SchemaLocator};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

// TcpIp event class opcodes (MOF TcpIp_TypeGroup1 / TcpIp_SendIPV4 etc).
const OPCODE_SEND_V4: u8 = 10;
const OPCODE_RECV_V4: u8 = 11;
const OPCODE_SEND_V6: u8 = 26;
const OPCODE_RECV_V6: u8 = 27;

#[derive(Debug, Default, Clone, Copy)]
pub struct EtwFeed;

impl EventFeed for EtwFeed {
    fn subscribe(
        &self,
        session_name: &str,
        sink: EventSink,
    ) -> Result<Arc<dyn Subscription>, IngestError> {
        let provider = Provider::kernel(&TCP_IP_PROVIDER)
            .add_callback(move |record: &EventRecord, locator: &SchemaLocator| {
                if let Some(event) = decode(record, locator) {
                    sink(event);
                }
            })
            .build();

        let (trace, handle) = KernelTrace::new()
            .named(session_name.to_string())
            .enable(provider)
            .start()
            .map_err(|e| IngestError::Subscribe(format!("{e:?}")))?;
        debug!(session = session_name, "ETW kernel session started");

        let process: ProcessFn = Box::new(move || {
            KernelTrace::process_from_handle(handle)
                .map_err(|e| IngestError::Process(format!("{e:?}")))
        });
        Ok(Arc::new(EtwSubscription {
            trace: Mutex::new(Some(trace)),
            process: Mutex::new(Some(process)),
        }))
    }
}

fn direction_for(opcode: u8) -> Option<Direction> {
    match opcode {
        OPCODE_RECV_V4 | OPCODE_RECV_V6 => Some(Direction::Received),
        OPCODE_SEND_V4 | OPCODE_SEND_V6 => Some(Direction::Sent),
        _ => None,
    }
}

fn decode(record: &EventRecord, locator: &SchemaLocator) -> Option<NetworkEvent> {
    let direction = direction_for(record.opcode())?;
    let schema = match locator.event_schema(record) {
        Ok(schema) => schema,
        Err(e) => {
            trace!(error = ?e, "no schema for TcpIp event");
            return None;
        }
    };
    let parser = Parser::create(record, &schema);
    let process_id: u32 = parser.try_parse("PID").ok()?;
    let size: u32 = parser.try_parse("size").ok()?;
    Some(NetworkEvent {
        process_id,
        size: u64::from(size),
        direction,
    })
}

type ProcessFn = Box<dyn FnOnce() -> Result<(), IngestError> + Send>;

struct EtwSubscription {
    trace: Mutex<Option<KernelTrace>>,
    // Taken by the single call to `process`.
    process: Mutex<Option<ProcessFn>>,
}

impl Subscription for EtwSubscription {
    fn process(&self) -> Result<(), IngestError> {
        let process = self
            .process
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(IngestError::Closed)?;
        process()
    }

    fn close(&self) -> Result<(), IngestError> {
        let trace = self.trace.lock().unwrap_or_else(|e| e.into_inner()).take();
        match trace {
            Some(trace) => trace
                .stop()
                .map_err(|e| IngestError::Process(format!("stop failed: {e:?}"))),
            None => Ok(()),
        }
    }
}
