use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use schedai_core::{ChatModel, ConversationHandle};

/// What the next `send_message` on any scripted chat should do.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Reply(String),
    Fail(String),
}

#[derive(Default)]
struct Shared {
    script: Mutex<VecDeque<ScriptedReply>>,
    received: Mutex<Vec<String>>,
    personas: Mutex<Vec<String>>,
    handles_started: AtomicUsize,
}

/// A chat model that plays back a queue of canned replies and failures.
///
/// The queue is shared by every chat the model starts; once it is drained
/// each call answers with the fixed fallback response.
#[derive(Clone)]
pub struct ScriptedModel {
    name: String,
    fallback: String,
    latency: Option<Duration>,
    shared: Arc<Shared>,
}

impl ScriptedModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fallback: "Mock response".to_string(),
            latency: None,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(ScriptedReply::Reply(reply.into()));
        self
    }

    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(ScriptedReply::Fail(message.into()));
        self
    }

    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = reply.into();
        self
    }

    /// Delay every reply, to exercise callers that wait on the remote side.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.shared.script.lock().unwrap().push_back(reply);
    }

    /// Number of conversations opened through `start_chat`.
    pub fn handles_started(&self) -> usize {
        self.shared.handles_started.load(Ordering::SeqCst)
    }

    /// Every message submitted to any chat, in arrival order.
    pub fn received(&self) -> Vec<String> {
        self.shared.received.lock().unwrap().clone()
    }

    /// The persona each chat was started with.
    pub fn personas(&self) -> Vec<String> {
        self.shared.personas.lock().unwrap().clone()
    }
}

impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn start_chat(&self, persona: &str) -> Box<dyn ConversationHandle> {
        self.shared.handles_started.fetch_add(1, Ordering::SeqCst);
        self.shared.personas.lock().unwrap().push(persona.to_string());
        Box::new(ScriptedChat {
            fallback: self.fallback.clone(),
            latency: self.latency,
            shared: Arc::clone(&self.shared),
            history: 0,
        })
    }
}

struct ScriptedChat {
    fallback: String,
    latency: Option<Duration>,
    shared: Arc<Shared>,
    history: usize,
}

#[async_trait]
impl ConversationHandle for ScriptedChat {
    async fn send_message(&mut self, text: &str) -> Result<String> {
        self.shared.received.lock().unwrap().push(text.to_string());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let next = self.shared.script.lock().unwrap().pop_front();
        match next {
            Some(ScriptedReply::Fail(message)) => bail!(message),
            Some(ScriptedReply::Reply(reply)) => {
                self.history += 2;
                Ok(reply)
            }
            None => {
                self.history += 2;
                Ok(self.fallback.clone())
            }
        }
    }

    fn history_len(&self) -> usize {
        self.history
    }
}
