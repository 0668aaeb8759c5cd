//! Observability subsystem
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle events
//! - Scope-based BEGIN/COMPLETE tracing
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Nothing logged ever enters an artifact or a hash
//! 3. No async or background threads
//!
//! ```ignore
//! use biomed_oracle::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::ScoreComplete, &[("recipe", "inflammation_score_v1")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event_severity(event), event.as_str(), fields);
}

/// Failure events log at ERROR, everything else at INFO.
fn event_severity(event: Event) -> Severity {
    if event.is_failure() {
        Severity::Error
    } else {
        Severity::Info
    }
}
