//! Completion bridge: sends the latest user message to an LLM (mock or live
//! OpenAI-compatible API) and returns generated text.
//!
//! Single-turn by design: each call carries the fixed system instruction plus
//! the one message, never conversational history. The gateway holds the API
//! key; clients of the HTTP API never see it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};

const ENV_LLM_API_KEY: &str = "HAVEN_LLM_API_KEY";
const ENV_GROQ_API_KEY: &str = "GROQ_API_KEY";

/// Fixed system instruction for every completion call.
const SYSTEM_INSTRUCTION: &str = "You are a supportive, empathetic AI companion for women's wellness and safety. \
    Be warm, non-judgmental, and encouraging. \
    Respond in plain text without emoji or special characters.";

/// Returned when the upstream payload parses but carries no choices.
const FALLBACK_RESPONSE: &str = "I'm here for you. How can I help?";

/// External collaborator surface the chat pipeline depends on: one blocking
/// completion call, no internal retry.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate a response for a single user message.
    async fn complete(&self, message: &str) -> CoreResult<String>;
}

/// Mode for LLM invocation: mock (canned response, no network) or live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

// OpenAI-compatible request/response structures
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Routes a message to a mock LLM or a live OpenAI-compatible endpoint (Groq
/// by default). Latency policy lives here: 60 s request timeout on the client.
pub struct CompletionBridge {
    mode: LlmMode,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl CompletionBridge {
    /// Bridge configured from [`CoreConfig`] (mode, endpoint, model).
    pub fn from_config(config: &CoreConfig) -> Self {
        let mode = if config.llm_live() { LlmMode::Live } else { LlmMode::Mock };
        Self::new(mode, &config.llm_api_url, &config.llm_model)
    }

    pub fn new(mode: LlmMode, api_url: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            mode,
            api_url: api_url.to_string(),
            model: model.to_string(),
            client,
        }
    }

    /// API key: `HAVEN_LLM_API_KEY`, or `GROQ_API_KEY` as fallback.
    fn api_key() -> CoreResult<String> {
        let key = std::env::var(ENV_LLM_API_KEY)
            .or_else(|_| std::env::var(ENV_GROQ_API_KEY))
            .map_err(|_| CoreError::Upstream(format!("missing {} or {}", ENV_LLM_API_KEY, ENV_GROQ_API_KEY)))?;
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(CoreError::Upstream(format!("missing {} or {}", ENV_LLM_API_KEY, ENV_GROQ_API_KEY)));
        }
        Ok(key)
    }

    async fn complete_live(&self, message: &str) -> CoreResult<String> {
        let api_key = Self::api_key()?;
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: message.to_string(),
                },
            ],
        };

        let res = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("completion request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(CoreError::Upstream(format!("completion API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| CoreError::Upstream(format!("completion response parse failed: {}", e)))?;

        let text = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_else(|| FALLBACK_RESPONSE.to_string());

        Ok(text)
    }
}

#[async_trait]
impl Responder for CompletionBridge {
    async fn complete(&self, message: &str) -> CoreResult<String> {
        match self.mode {
            LlmMode::Mock => Ok(
                "[Generated – Mock LLM]\n\nThank you for sharing that with me. I'm here with you, \
                 and we can take this one step at a time."
                    .to_string(),
            ),
            LlmMode::Live => self.complete_live(message).await,
        }
    }
}
