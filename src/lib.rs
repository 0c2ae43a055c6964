// Library for tests to access modules

pub mod clock;
pub mod config;
pub mod counters;
pub mod error;
pub mod feed;
mod ingestor;
pub mod models;
pub mod reporter;
pub mod version;

pub use error::{IngestError, ReporterError};
pub use models::{Direction, NetworkEvent, NetworkPerformanceSnapshot, ReporterStatus};
pub use reporter::{NetworkPerformanceReporter, ReporterBuilder};
