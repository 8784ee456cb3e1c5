//! JSON chat endpoints: `/api/chat`, `/api/transcript`, `/api/health`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use schedai_core::{ChatError, Turn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};

use crate::server::GatewayState;
use crate::session_cookie::SessionScope;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub transcript_len: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub version: String,
    pub model: String,
    pub sessions: u64,
    pub uptime_seconds: u64,
}

/// A [`ChatError`] rendered as `{ "error": ... }` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub ChatError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
            ChatError::RemoteCallFailed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Run one exchange on the caller's session, creating it on first use.
///
/// The session lock is held for the whole remote call, so a second submit
/// on the same session waits for the first to finish.
pub async fn run_exchange(
    state: &GatewayState,
    session_id: &str,
    message: &str,
) -> Result<ChatReply, ChatError> {
    if message.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }

    let session = state.sessions.get_or_create_session(session_id);
    let mut session = session.lock().await;
    match session.submit_message(message).await {
        Ok(reply) => Ok(ChatReply {
            reply,
            transcript_len: session.transcript().len(),
        }),
        Err(err) => {
            error!(session_id = %session_id, error = %err, "Exchange failed");
            Err(err)
        }
    }
}

/// Snapshot of the caller's transcript. Does not create a session.
pub async fn transcript_of(state: &GatewayState, session_id: &str) -> Vec<Turn> {
    match state.sessions.get(session_id) {
        Some(session) => session.lock().await.transcript().turns().to_vec(),
        None => Vec::new(),
    }
}

/// Handler for `POST /api/chat`.
pub async fn chat(
    State(state): State<GatewayState>,
    scope: SessionScope,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match request {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(session_id = %scope.id(), reason = %rejection.body_text(), "Rejected chat body");
            let body = Json(json!({ "error": rejection.body_text() }));
            return scope.attach((rejection.status(), body).into_response());
        }
    };
    let response = match run_exchange(&state, scope.id(), &request.message).await {
        Ok(reply) => Json(reply).into_response(),
        Err(err) => {
            if matches!(err, ChatError::EmptyMessage) {
                warn!(session_id = %scope.id(), "Rejected empty message");
            }
            ApiError(err).into_response()
        }
    };
    scope.attach(response)
}

/// Handler for `GET /api/transcript`.
pub async fn transcript(State(state): State<GatewayState>, scope: SessionScope) -> Response {
    let turns = transcript_of(&state, scope.id()).await;
    scope.attach(Json(turns).into_response())
}

/// Handler for `GET /api/health`.
pub async fn health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".into(),
        service: "schedai".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        model: state.sessions.model().model().to_string(),
        sessions: state.sessions.session_count(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::HeaderMap;
    use schedai_core::Role;
    use schedai_providers::ScriptedModel;
    use serde_json::Value;

    use crate::server::tests::test_state;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(message: &str) -> Result<Json<ChatRequest>, JsonRejection> {
        Ok(Json(ChatRequest {
            message: message.to_string(),
        }))
    }

    #[tokio::test]
    async fn test_chat_success_returns_reply() {
        let model = ScriptedModel::new("mock").with_reply("Booked **3 PM**.");
        let state = test_state(&model);
        let scope = SessionScope::from_headers(&HeaderMap::new());

        let response = chat(State(state.clone()), scope.clone(), request("Book 3 PM")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("set-cookie"));

        let body = body_json(response).await;
        assert_eq!(body["reply"], "Booked **3 PM**.");
        assert_eq!(body["transcript_len"], 2);

        let turns = transcript_of(&state, scope.id()).await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role(), Role::User);
        assert_eq!(turns[1].content(), "Booked **3 PM**.");
    }

    #[tokio::test]
    async fn test_chat_remote_failure_is_bad_gateway() {
        let model = ScriptedModel::new("mock").with_failure("network timeout");
        let state = test_state(&model);
        let scope = SessionScope::from_headers(&HeaderMap::new());

        let response = chat(State(state.clone()), scope.clone(), request("Book X")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("An error occurred while communicating with the AI:"));
        assert!(message.contains("network timeout"));

        // The user turn stays, with no reply after it.
        let turns = transcript_of(&state, scope.id()).await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content(), "Book X");
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let model = ScriptedModel::new("mock");
        let state = test_state(&model);
        let scope = SessionScope::from_headers(&HeaderMap::new());

        let response = chat(State(state.clone()), scope, request("   ")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.sessions.session_count(), 0);
        assert_eq!(model.handles_started(), 0);
    }

    #[tokio::test]
    async fn test_transcript_for_unknown_session_is_empty() {
        let model = ScriptedModel::new("mock");
        let state = test_state(&model);
        let scope = SessionScope::from_headers(&HeaderMap::new());

        let response = transcript(State(state.clone()), scope).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
        assert_eq!(state.sessions.session_count(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_sessions() {
        let model = ScriptedModel::new("mock");
        let state = test_state(&model);
        state.sessions.get_or_create_session("a");
        state.sessions.get_or_create_session("b");

        let Json(report) = health(State(state)).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.service, "schedai");
        assert_eq!(report.sessions, 2);
    }
}
