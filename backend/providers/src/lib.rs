//! Remote chat model clients.
//!
//! [`gemini::GeminiModel`] talks to the hosted Gemini API; [`mock::ScriptedModel`]
//! replays canned replies for tests and offline runs.

pub mod gemini;
pub mod mock;

pub use gemini::{GeminiChat, GeminiModel};
pub use mock::{ScriptedModel, ScriptedReply};
