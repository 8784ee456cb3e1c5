//! Main HTTP gateway server and routing.

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use schedai_config::schema::AssistantConfig;
use schedai_session::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::chat_api;
use crate::control_ui;
use crate::ws_server;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub sessions: SessionManager,
    pub assistant: Arc<AssistantConfig>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(sessions: SessionManager, assistant: AssistantConfig) -> Self {
        Self {
            sessions,
            assistant: Arc::new(assistant),
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/health", get(chat_api::health))
        .route("/api/transcript", get(chat_api::transcript))
        .route("/api/chat", post(chat_api::chat))
        .route("/api/ws", get(ws_server::ws_handler))
        .merge(control_ui::ui_router())
        .with_state(state)
}

/// Starts the HTTP server and serves until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    serve(listener, state).await
}

/// Serve on an already-bound listener.
pub async fn serve(listener: TcpListener, state: GatewayState) -> Result<()> {
    info!("Gateway HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Gateway HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use schedai_providers::ScriptedModel;
    use schedai_session::{Persona, SessionSettings};
    use serde_json::{Value, json};

    pub(crate) fn test_state(model: &ScriptedModel) -> GatewayState {
        let sessions = SessionManager::new(
            Arc::new(model.clone()),
            Persona::scheduling(),
            SessionSettings::default(),
        );
        GatewayState::new(sessions, AssistantConfig::default())
    }

    async fn spawn(state: GatewayState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_cookie_keeps_one_conversation_across_requests() {
        let model = ScriptedModel::new("mock")
            .with_reply("First reply")
            .with_reply("Second reply");
        let state = test_state(&model);
        let base = spawn(state.clone()).await;
        let client = reqwest::Client::builder().cookie_store(true).build().unwrap();

        let page = client.get(format!("{base}/")).send().await.unwrap();
        assert!(page.headers().contains_key("set-cookie"));
        assert!(page.text().await.unwrap().contains("Scheduling System AI"));

        for message in ["one", "two"] {
            let response = client
                .post(format!("{base}/api/chat"))
                .json(&json!({ "message": message }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
        }

        let turns: Value = client
            .get(format!("{base}/api/transcript"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let contents: Vec<&str> = turns
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["content"].as_str().unwrap())
            .collect();
        assert_eq!(contents, vec!["one", "First reply", "two", "Second reply"]);
        assert_eq!(model.handles_started(), 1);
    }

    #[tokio::test]
    async fn test_separate_browsers_get_separate_sessions() {
        let model = ScriptedModel::new("mock");
        let state = test_state(&model);
        let base = spawn(state.clone()).await;

        for _ in 0..2 {
            let client = reqwest::Client::builder().cookie_store(true).build().unwrap();
            let response = client
                .post(format!("{base}/api/chat"))
                .json(&json!({ "message": "hello" }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 200);
        }

        assert_eq!(model.handles_started(), 2);
        let health: Value = reqwest::get(format!("{base}/api/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["sessions"], 2);
        assert_eq!(health["model"], "scripted");
    }

    #[tokio::test]
    async fn test_malformed_chat_body_gets_json_error() {
        let model = ScriptedModel::new("mock");
        let state = test_state(&model);
        let base = spawn(state).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/api/chat"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

        let response = client
            .post(format!("{base}/api/chat"))
            .json(&json!({ "text": "wrong field" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 422);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("message"));
        assert_eq!(model.handles_started(), 0);
    }
}
