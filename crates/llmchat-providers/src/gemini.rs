//! Google Gemini REST client (`generateContent` / `streamGenerateContent`).
//!
//! Roles map `user → "user"` and everything else `→ "model"`. The API key is
//! sent as the `key` query parameter, so request URLs are never logged and
//! transport errors are reported without them.

use async_trait::async_trait;
use llmchat_core::types::{Message, Role};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ensure_success, LlmError, Result};
use crate::registry::{ModelConfig, ProviderKind};
use crate::session::HttpSession;
use crate::streaming::{fragment_stream, gemini_fragment};
use crate::traits::{credential_outcome, validate_request, ChatOptions, ChatOutput, LlmProvider};

/// `maxOutputTokens` when the caller sets no limit.
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

pub struct GeminiProvider {
    config: ModelConfig,
    session: HttpSession,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.config.base_url())
            .field("model", &self.config.name)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate_for(ProviderKind::Gemini)?;
        let session = HttpSession::new("Gemini", config.request_timeout);
        Ok(Self { config, session })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/models/{}:{}", self.config.base_url(), self.config.name, action)
    }

    fn request_body(messages: &[Message], options: &ChatOptions) -> Value {
        let contents: Vec<Value> = messages
            .iter()
            .map(|msg| {
                let role = if msg.role == Role::User { "user" } else { "model" };
                json!({ "role": role, "parts": [{ "text": msg.content }] })
            })
            .collect();

        json!({
            "contents": contents,
            "generationConfig": {
                "temperature": options.temperature,
                "maxOutputTokens": options.max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            }
        })
    }

    async fn post(&self, action: &str, body: &Value, stream: bool) -> Result<reqwest::Response> {
        let client = self.session.client()?;
        let mut request = client
            .post(self.endpoint(action))
            .query(&[("key", self.config.api_key())]);
        if stream {
            request = request.query(&[("alt", "sse")]);
        }
        let response = request.json(body).send().await?;
        ensure_success(response, "Gemini").await
    }
}

fn extract_text(data: &Value) -> Result<String> {
    let candidates = data
        .get("candidates")
        .and_then(Value::as_array)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| LlmError::api("Gemini: no response generated"))?;

    candidates[0]
        .pointer("/content/parts/0/text")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| LlmError::api("Gemini: invalid response format"))
}

#[async_trait]
impl LlmProvider for GeminiProvider {
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

        let body = Self::request_body(messages, options);
        debug!(
            provider = "Gemini",
            model = %self.config.name,
            messages = messages.len(),
            stream = options.stream,
            body = %body,
            "Calling LLM"
        );

        if options.stream {
            let response = self.post("streamGenerateContent", &body, true).await?;
            return Ok(ChatOutput::Stream(fragment_stream(
                response.bytes_stream(),
                gemini_fragment,
                "Gemini",
            )));
        }

        let response = self.post("generateContent", &body, false).await?;
        let data: Value = serde_json::from_slice(&response.bytes().await?)?;
        debug!(provider = "Gemini", response = %data, "LLM response received");
        extract_text(&data).map(ChatOutput::Text)
    }

    async fn validate_credentials(&self) -> Result<bool> {
        let test_message = [Message::user("Connection test")];
        let options = ChatOptions {
            temperature: 0.1,
            max_tokens: Some(10),
            stream: false,
        };
        let body = Self::request_body(&test_message, &options);
        let result = match self.post("generateContent", &body, false).await {
            Ok(response) => response
                .bytes()
                .await
                .map_err(LlmError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<Value>(&bytes)?))
                .and_then(|data| extract_text(&data))
                .map(|_| ()),
            Err(e) => Err(e),
        };
        credential_outcome("Gemini", result)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
