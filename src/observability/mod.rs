//! Observability for cruddydb
//!
//! Structured JSON logging of typed lifecycle and operation events.
//! Logging is synchronous and never fails the caller.
//!
//! ```ignore
//! use cruddydb::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::RowsCreated, &[("table", "users"), ("rows", "3")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event with fields at its default severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.default_severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // This just verifies no panic
        log_event_with_fields(Event::RowsDeleted, &[("key", "users/1")]);
    }
}
