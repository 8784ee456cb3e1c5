//! WebSocket entrypoint and connection handler.
//!
//! Upgrades HTTP to WS, replays the caller's transcript, then runs one
//! exchange per `submit` frame.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use schedai_core::ChatError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat_api::{run_exchange, transcript_of};
use crate::markdown::render_markdown;
use crate::server::GatewayState;
use crate::session_cookie::SessionScope;
use crate::ws_protocol::WsMessage;

/// Handler for `GET /api/ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    scope: SessionScope,
) -> Response {
    let session_id = scope.id().to_string();
    let response = ws.on_upgrade(move |socket| handle_connection(socket, state, session_id));
    scope.attach(response)
}

async fn handle_connection(socket: WebSocket, state: GatewayState, session_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    info!(session_id = %session_id, "WebSocket connected");

    let turns = transcript_of(&state, &session_id).await;
    let _ = tx.send(WsMessage::transcript(&turns));

    // Forward from the app channel to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "Failed to encode outgoing message");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_session = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<WsMessage>(&text) {
                    Ok(ws_msg) => handle_incoming_message(ws_msg, &tx, &state, &recv_session).await,
                    Err(_) => warn!("Received invalid JSON message: {}", text),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // If either task exits, abort the other.
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!(session_id = %session_id, "WebSocket connection closed");
}

pub(crate) async fn handle_incoming_message(
    msg: WsMessage,
    reply_tx: &mpsc::UnboundedSender<WsMessage>,
    state: &GatewayState,
    session_id: &str,
) {
    match msg {
        WsMessage::Ping => {
            let _ = reply_tx.send(WsMessage::Pong);
        }
        WsMessage::Submit { content } => {
            debug!(session_id = %session_id, "Received submit");
            let _ = reply_tx.send(WsMessage::state("thinking"));

            // The exchange runs on its own task so a closing socket cannot
            // abort it; awaiting the handle keeps submits in arrival order.
            let state = state.clone();
            let session_id = session_id.to_string();
            let reply_tx = reply_tx.clone();
            let exchange = tokio::spawn(async move {
                let outcome = match run_exchange(&state, &session_id, &content).await {
                    Ok(reply) => WsMessage::Reply {
                        html: render_markdown(&reply.reply),
                        content: reply.reply,
                    },
                    Err(err) => WsMessage::Error {
                        error_code: error_code(&err).to_string(),
                        message: err.to_string(),
                    },
                };
                let _ = reply_tx.send(outcome);
                let _ = reply_tx.send(WsMessage::state("idle"));
            });
            if let Err(err) = exchange.await {
                warn!(error = %err, "Exchange task failed");
            }
        }
        _ => warn!("Received unexpected message type from client"),
    }
}

fn error_code(err: &ChatError) -> &'static str {
    match err {
        ChatError::EmptyMessage => "empty_message",
        ChatError::RemoteCallFailed { .. } => "remote_call_failed",
        _ => "internal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedai_providers::ScriptedModel;

    use crate::server::tests::test_state;

    fn drain(rx: &mut mpsc::UnboundedReceiver<WsMessage>) -> Vec<WsMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_submit_brackets_reply_with_state_changes() {
        let model = ScriptedModel::new("mock").with_reply("Your meeting is set.");
        let state = test_state(&model);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let submit = WsMessage::Submit {
            content: "Schedule a sync".into(),
        };
        handle_incoming_message(submit, &tx, &state, "ws-1").await;

        assert_eq!(
            drain(&mut rx),
            vec![
                WsMessage::state("thinking"),
                WsMessage::Reply {
                    content: "Your meeting is set.".into(),
                    html: "<p>Your meeting is set.</p>\n".into(),
                },
                WsMessage::state("idle"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported_inline_and_next_submit_works() {
        let model = ScriptedModel::new("mock")
            .with_failure("quota exceeded")
            .with_reply("Done.");
        let state = test_state(&model);
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_incoming_message(WsMessage::Submit { content: "A".into() }, &tx, &state, "ws-2").await;
        let first = drain(&mut rx);
        match &first[1] {
            WsMessage::Error { error_code, message } => {
                assert_eq!(error_code, "remote_call_failed");
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("expected error, got {other:?}"),
        }

        handle_incoming_message(WsMessage::Submit { content: "B".into() }, &tx, &state, "ws-2").await;
        let second = drain(&mut rx);
        assert!(matches!(&second[1], WsMessage::Reply { content, .. } if content == "Done."));

        let turns = transcript_of(&state, "ws-2").await;
        let contents: Vec<&str> = turns.iter().map(|t| t.content()).collect();
        assert_eq!(contents, vec!["A", "B", "Done."]);
    }

    #[tokio::test]
    async fn test_empty_submit_and_ping() {
        let model = ScriptedModel::new("mock");
        let state = test_state(&model);
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_incoming_message(WsMessage::Ping, &tx, &state, "ws-3").await;
        handle_incoming_message(WsMessage::Submit { content: " ".into() }, &tx, &state, "ws-3").await;

        let out = drain(&mut rx);
        assert_eq!(out[0], WsMessage::Pong);
        assert!(matches!(&out[2], WsMessage::Error { error_code, .. } if error_code == "empty_message"));
        assert_eq!(model.handles_started(), 0);
    }

    #[tokio::test]
    async fn test_closing_socket_does_not_cancel_exchange() {
        let model = ScriptedModel::new("mock")
            .with_latency(std::time::Duration::from_millis(200))
            .with_reply("Call scheduled.");
        let state = test_state(&model);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let connection = {
            let state = state.clone();
            tokio::spawn(async move {
                let submit = WsMessage::Submit {
                    content: "Schedule a call".into(),
                };
                handle_incoming_message(submit, &tx, &state, "ws-4").await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        connection.abort();
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;

        let turns = transcript_of(&state, "ws-4").await;
        let contents: Vec<&str> = turns.iter().map(|t| t.content()).collect();
        assert_eq!(contents, vec!["Schedule a call", "Call scheduled."]);

        let out = drain(&mut rx);
        assert!(matches!(&out[1], WsMessage::Reply { content, .. } if content == "Call scheduled."));
    }
}
