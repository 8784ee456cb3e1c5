//! WebSocket protocol for the chat page.

use schedai_core::{Role, Turn};
use serde::{Deserialize, Serialize};

use crate::markdown::render_markdown;

/// A transcript turn as the page draws it. Assistant turns carry their
/// markdown rendered to HTML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnView {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl From<&Turn> for TurnView {
    fn from(turn: &Turn) -> Self {
        let html = (turn.role() == Role::Assistant).then(|| render_markdown(turn.content()));
        Self {
            role: turn.role(),
            content: turn.content().to_string(),
            html,
        }
    }
}

/// Messages exchanged over `/api/ws`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Client -> Server: keepalive
    Ping,
    /// Server -> Client
    Pong,
    /// Client -> Server: one user message
    Submit { content: String },
    /// Server -> Client: the assistant's answer to the last submit
    Reply { content: String, html: String },
    /// Server -> Client: the last submit failed; shown in place of a reply
    Error { error_code: String, message: String },
    /// Server -> Client: `thinking` while a reply is outstanding, then `idle`
    StateChange { state: String },
    /// Server -> Client: full history, sent on connect
    Transcript { turns: Vec<TurnView> },
}

impl WsMessage {
    pub fn state(state: &str) -> Self {
        WsMessage::StateChange {
            state: state.to_string(),
        }
    }

    pub fn transcript(turns: &[Turn]) -> Self {
        WsMessage::Transcript {
            turns: turns.iter().map(TurnView::from).collect(),
        }
    }
}
