//! ObservationScope: begin/complete/failed logging around one pass
//!
//! - `{EVENT}_BEGIN` on creation (TRACE)
//! - `{EVENT}_COMPLETE` on `complete()` (INFO), with elapsed time
//! - `{EVENT}_FAILED` on `fail()` (WARN)
//! - `{EVENT}_INCOMPLETE` if dropped without either (WARN)

use std::cell::Cell;
use std::time::Instant;

use super::events::Event;
use super::logger::Logger;

pub struct ObservationScope {
    event: Event,
    completed: Cell<bool>,
    fields: Vec<(&'static str, String)>,
    timer: Timer,
}

impl ObservationScope {
    pub fn new(event: Event) -> Self {
        Self::with_fields(event, Vec::new())
    }

    pub fn with_fields(event: Event, fields: Vec<(&'static str, String)>) -> Self {
        let scope = Self {
            event,
            completed: Cell::new(false),
            fields,
            timer: Timer::new(),
        };
        Logger::trace(&format!("{}_BEGIN", event), &scope.field_refs(&[]));
        scope
    }

    fn field_refs<'a>(&'a self, extra: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut refs: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        refs.extend_from_slice(extra);
        refs
    }

    pub fn complete(self) {
        self.completed.set(true);
        let elapsed = self.timer.elapsed_us();
        Logger::info(
            &format!("{}_COMPLETE", self.event),
            &self.field_refs(&[("elapsed_us", elapsed.as_str())]),
        );
    }

    pub fn fail(self, reason: &str) {
        self.completed.set(true);
        Logger::warn(
            &format!("{}_FAILED", self.event),
            &self.field_refs(&[("reason", reason)]),
        );
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed.get() {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.event),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// Duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed microseconds as a string
    pub fn elapsed_us(&self) -> String {
        self.start.elapsed().as_micros().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
