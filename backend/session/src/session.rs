//! One user's conversation: the local transcript and the remote handle it mirrors.

use schedai_core::{ChatError, ConversationHandle, Transcript, Turn};
use schedai_logging::{ChatEvent, ChatEventLogger};
use tracing::{debug, instrument};

pub type SessionId = String;

/// Aggregate of the visible transcript and the remote conversation.
///
/// Both sides only ever grow, and they grow in the same step: the user turn
/// is recorded before the remote call, the assistant turn only after it
/// succeeds.
pub struct Session {
    id: SessionId,
    transcript: Transcript,
    handle: Box<dyn ConversationHandle>,
}

impl Session {
    pub fn new(id: impl Into<SessionId>, handle: Box<dyn ConversationHandle>) -> Self {
        Self {
            id: id.into(),
            transcript: Transcript::new(),
            handle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// How many messages the remote side holds. Never more than the transcript.
    pub fn remote_history_len(&self) -> usize {
        self.handle.history_len()
    }

    /// Run one exchange and return the assistant's reply.
    ///
    /// A failed remote call leaves the user turn in the transcript with no
    /// reply after it and is not retried.
    #[instrument(skip(self, user_text), fields(session_id = %self.id))]
    pub async fn submit_message(&mut self, user_text: &str) -> Result<String, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.transcript.push(Turn::user(user_text));
        ChatEventLogger::log_event(
            &self.id,
            ChatEvent::Message {
                role: schedai_core::Role::User,
                content: user_text.to_string(),
            },
        );

        match self.handle.send_message(user_text).await {
            Ok(reply) => {
                self.transcript.push(Turn::assistant(reply.clone()));
                ChatEventLogger::log_event(
                    &self.id,
                    ChatEvent::Message {
                        role: schedai_core::Role::Assistant,
                        content: reply.clone(),
                    },
                );
                debug!(turns = self.transcript.len(), "Exchange completed");
                Ok(reply)
            }
            Err(err) => {
                let err = ChatError::remote(&err);
                ChatEventLogger::log_event(
                    &self.id,
                    ChatEvent::Error {
                        error_msg: err.to_string(),
                    },
                );
                Err(err)
            }
        }
    }
}
