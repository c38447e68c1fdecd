//! Structured logging for Turnstile.
//!
//! Logger initialisation (console plus rolling JSON file), log redaction, and
//! a `tracing`-backed event sink for orchestration runs.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{redact_event, TracingEventSink, EVENT_TARGET};
pub use logger::{init_console_logger, init_logger, LOG_FILE_PREFIX};
pub use redact::{redact_sensitive_data, redact_value};
