//! Chat Event Logger
//!
//! Structured per-session events (turns, failures) emitted through `tracing`
//! under the `chat_events` target, with secrets scrubbed first.

use chrono::{DateTime, Utc};
use schedai_core::Role;
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    SessionStarted { model: String },
    Message { role: Role, content: String },
    Error { error_msg: String },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ChatEvent,
}

impl EventLogEntry {
    /// Build a redacted entry stamped with the current time.
    pub fn new(session_id: &str, mut event: ChatEvent) -> Self {
        match &mut event {
            ChatEvent::Message { content, .. } => {
                *content = redact_sensitive_data(content);
            }
            ChatEvent::Error { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            ChatEvent::SessionStarted { .. } => {}
        }
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            event,
        }
    }
}

pub struct ChatEventLogger;

impl ChatEventLogger {
    /// Log one session event. Failures go out at WARN, everything else at INFO.
    pub fn log_event(session_id: &str, event: ChatEvent) {
        let entry = EventLogEntry::new(session_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        match entry.event {
            ChatEvent::Error { .. } => {
                warn!(target: "chat_events", session_id = %entry.session_id, event = %json, "Chat event")
            }
            _ => info!(target: "chat_events", session_id = %entry.session_id, event = %json, "Chat event"),
        }
    }
}
