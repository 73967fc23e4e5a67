//! Observability for docshape
//!
//! - Structured logging (JSON lines, deterministic key order)
//! - Typed lifecycle events
//! - Scope-based begin/complete logging around validation passes
//!
//! Observability is read-only: it never changes a validation result.

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event at INFO (FATAL for fatal events)
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ConfigLoaded);
        log_event_with_fields(Event::SchemaLoaded, &[("name", "users")]);
    }
}
