//! Telemetry and structured logging for Roundtable.
//!
//! Handles console and rolling NDJSON file output, plus structured turn events.

pub mod event_logger;
pub mod logger;

pub use event_logger::{EventLogEntry, EventLogger, TurnEvent};
pub use logger::init_logger;
