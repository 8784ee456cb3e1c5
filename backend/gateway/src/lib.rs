//! schedai gateway HTTP server.
//!
//! Serves the embedded chat page, the JSON chat API and the chat WebSocket.

pub mod chat_api;
pub mod control_ui;
pub mod markdown;
pub mod server;
pub mod session_cookie;
pub mod ws_protocol;
pub mod ws_server;

pub use server::{GatewayState, build_router, serve, start_server};
pub use session_cookie::SessionScope;
