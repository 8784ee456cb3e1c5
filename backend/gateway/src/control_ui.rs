//! Embedded chat page served at `/`.

use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use schedai_config::schema::AssistantConfig;

use crate::server::GatewayState;
use crate::session_cookie::SessionScope;

const PAGE_TEMPLATE: &str = include_str!("../assets/index.html");

pub fn ui_router() -> Router<GatewayState> {
    Router::new().route("/", get(index))
}

/// Handler for `GET /`. Also hands out the session cookie on first visit.
pub async fn index(State(state): State<GatewayState>, scope: SessionScope) -> Response {
    scope.attach(Html(render_page(&state.assistant)).into_response())
}

pub fn render_page(assistant: &AssistantConfig) -> String {
    PAGE_TEMPLATE
        .replace("{{title}}", &escape_html(&assistant.title))
        .replace("{{icon}}", &escape_html(&assistant.icon))
        .replace("{{welcome}}", &escape_html(&assistant.welcome))
        .replace("{{input_placeholder}}", &escape_html(&assistant.input_placeholder))
        .replace("{{thinking_label}}", &escape_html(&assistant.thinking_label))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
