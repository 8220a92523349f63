//! Observable events for cruddydb
//!
//! Events are explicit and typed; the string form is the `event` key of a log line.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    // Setup
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Schema declaration compiled into tables
    SchemaCompiled,
    /// Storage medium restored from a snapshot
    StoreLoaded,
    /// Storage medium written to a snapshot
    StoreSaved,

    // Engine operations
    RowsCreated,
    RowsRead,
    RowsUpdated,
    RowsDeleted,
    /// A batch failed validation before any write
    BatchRejected,

    // Request queue
    RequestQueued,
    RequestDispatched,
    RequestCompleted,
    /// Queue drained, no request in flight
    QueueIdle,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaCompiled => "SCHEMA_COMPILED",
            Event::StoreLoaded => "STORE_LOADED",
            Event::StoreSaved => "STORE_SAVED",
            Event::RowsCreated => "ROWS_CREATED",
            Event::RowsRead => "ROWS_READ",
            Event::RowsUpdated => "ROWS_UPDATED",
            Event::RowsDeleted => "ROWS_DELETED",
            Event::BatchRejected => "BATCH_REJECTED",
            Event::RequestQueued => "REQUEST_QUEUED",
            Event::RequestDispatched => "REQUEST_DISPATCHED",
            Event::RequestCompleted => "REQUEST_COMPLETED",
            Event::QueueIdle => "QUEUE_IDLE",
        }
    }

    /// Per-request events are TRACE, rejections WARN, everything else INFO
    pub fn default_severity(&self) -> super::Severity {
        match self {
            Event::RowsRead
            | Event::RequestQueued
            | Event::RequestDispatched
            | Event::RequestCompleted
            | Event::QueueIdle => super::Severity::Trace,
            Event::BatchRejected => super::Severity::Warn,
            _ => super::Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
