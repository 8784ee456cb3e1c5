use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use schedai_core::{ChatModel, ConversationHandle};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini provider. Cheap to share: every chat it starts reuses the
/// same HTTP connection pool and credential.
pub struct GeminiModel {
    client: Client,
    api_key: Arc<str>,
    model: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: Arc::from(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl ChatModel for GeminiModel {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn start_chat(&self, persona: &str) -> Box<dyn ConversationHandle> {
        Box::new(GeminiChat {
            client: self.client.clone(),
            api_key: Arc::clone(&self.api_key),
            model: self.model.clone(),
            endpoint: format!("{}/models/{}:generateContent", self.base_url, self.model),
            persona: persona.to_string(),
            history: Vec::new(),
        })
    }
}

/// One Gemini conversation. The API is stateless, so the accumulated
/// history is resent with every request.
pub struct GeminiChat {
    client: Client,
    api_key: Arc<str>,
    model: String,
    endpoint: String,
    persona: String,
    history: Vec<Content>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content,
    contents: &'a [Content],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
                thought: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

#[async_trait]
impl ConversationHandle for GeminiChat {
    async fn send_message(&mut self, text: &str) -> Result<String> {
        let start = Instant::now();

        let mut contents = self.history.clone();
        contents.push(Content::text(Some("user"), text));

        let body = GenerateContentRequest {
            system_instruction: Content::text(None, &self.persona),
            contents: &contents,
        };

        debug!(
            model = %self.model,
            history = self.history.len(),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.as_ref())
            .json(&body)
            .send()
            .await
            .context("Gemini HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Gemini returned {}: {}", status, error_body);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let tokens_used = parsed
            .usage_metadata
            .as_ref()
            .and_then(|u| u.total_token_count)
            .unwrap_or(0);

        let reply = extract_reply(parsed)?;

        // Only a successful exchange enters the remote history.
        self.history = contents;
        self.history.push(Content::text(Some("model"), &reply));

        debug!(
            model = %self.model,
            tokens_used,
            latency_ms = start.elapsed().as_millis() as u64,
            "Gemini reply received"
        );

        Ok(reply)
    }

    fn history_len(&self) -> usize {
        self.history.len()
    }
}

fn extract_reply(response: GenerateContentResponse) -> Result<String> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        bail!("Gemini blocked the prompt: {reason}");
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        bail!("Gemini returned no candidates");
    };

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|part| part.thought != Some(true))
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
        bail!("Gemini returned an empty reply (finish reason: {reason})");
    }

    Ok(text)
}
