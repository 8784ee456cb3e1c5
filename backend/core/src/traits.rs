use anyhow::Result;
use async_trait::async_trait;

/// A remote, server-side conversation context.
///
/// Each handle carries its own accumulated history and the persona it was
/// started with. Handles are owned by exactly one session and never cloned.
#[async_trait]
pub trait ConversationHandle: Send {
    /// Submit one user message and wait for the complete reply text.
    ///
    /// On error the handle's history must be left exactly as it was before
    /// the call.
    async fn send_message(&mut self, text: &str) -> Result<String>;

    /// Number of messages the remote side currently holds for this conversation.
    fn history_len(&self) -> usize;
}

/// Factory for conversation handles, configured once at startup and shared
/// read-only across every session.
pub trait ChatModel: Send + Sync {
    /// Provider name (e.g., "gemini", "scripted").
    fn name(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Open a fresh conversation bound to `persona` as its system instruction.
    fn start_chat(&self, persona: &str) -> Box<dyn ConversationHandle>;
}
