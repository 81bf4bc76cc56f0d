//! Hosted OpenAI-compatible `/chat/completions` client, used for Mistral and DeepSeek.

use async_trait::async_trait;
use llmchat_core::types::Message;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ensure_success, LlmError, Result};
use crate::registry::{ModelConfig, ProviderKind};
use crate::session::HttpSession;
use crate::streaming::{fragment_stream, openai_delta_fragment};
use crate::traits::{credential_outcome, validate_request, ChatOptions, ChatOutput, LlmProvider};

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ─────────────────────────────────────────────
// OpenAiCompatProvider
// ─────────────────────────────────────────────

/// Bearer-authenticated OpenAI-style chat API.
pub struct OpenAiCompatProvider {
    config: ModelConfig,
    session: HttpSession,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("provider", &self.display_name())
            .field("api_base", &self.config.base_url())
            .field("model", &self.config.name)
            .finish()
    }
}

impl OpenAiCompatProvider {
    pub fn new(config: ModelConfig) -> Result<Self> {
        match config.provider {
            ProviderKind::Mistral | ProviderKind::DeepSeek => config.validate()?,
            other => {
                return Err(LlmError::validation(format!(
                    "{} is not an OpenAI-compatible hosted API",
                    other.spec().display_name
                )))
            }
        }
        let session = HttpSession::new(config.provider.spec().display_name, config.request_timeout);
        Ok(Self { config, session })
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url())
    }

    fn request_body<'a>(
        &'a self,
        messages: &'a [Message],
        options: &ChatOptions,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.name,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: options.stream,
        }
    }

    async fn post(&self, body: &ChatCompletionRequest<'_>) -> Result<reqwest::Response> {
        let client = self.session.client()?;
        let response = client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .json(body)
            .send()
            .await?;
        ensure_success(response, self.session_label()).await
    }

    fn session_label(&self) -> &'static str {
        self.config.provider.spec().display_name
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn session(&self) -> &HttpSession {
        &self.session
    }

    async fn chat_completion(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatOutput> {
        validate_request(messages, options)?;

        let body = self.request_body(messages, options);
        debug!(
            provider = self.session_label(),
            model = %self.config.name,
            messages = messages.len(),
            stream = options.stream,
            body = ?body,
            "Calling LLM"
        );

        let response = self.post(&body).await?;
        if options.stream {
            return Ok(ChatOutput::Stream(fragment_stream(
                response.bytes_stream(),
                openai_delta_fragment,
                self.session_label(),
            )));
        }

        let raw = response.bytes().await?;
        debug!(
            provider = self.session_label(),
            response = %String::from_utf8_lossy(&raw),
            "LLM response received"
        );
        let parsed: ChatCompletionResponse = serde_json::from_slice(&raw)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(ChatOutput::Text)
            .ok_or_else(|| {
                LlmError::api(format!("{}: no response generated", self.session_label()))
            })
    }

    async fn validate_credentials(&self) -> Result<bool> {
        let test_message = [Message::user("Connection test")];
        let options = ChatOptions {
            temperature: 0.1,
            max_tokens: Some(10),
            stream: false,
        };
        let body = self.request_body(&test_message, &options);
        let result = self.post(&body).await.map(|_| ());
        credential_outcome(self.session_label(), result)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
