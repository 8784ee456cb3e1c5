//! Telemetry and structured logging for schedai.
//!
//! Handles subscriber setup, log redaction, and per-session chat event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{ChatEvent, ChatEventLogger, EventLogEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
