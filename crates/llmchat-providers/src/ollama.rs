//! Ollama local server (`/api/chat`).

use async_trait::async_trait;
use llmchat_core::types::{Message, Role};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ensure_success, LlmError, Result};
use crate::registry::{ModelConfig, ProviderKind};
use crate::session::HttpSession;
use crate::traits::{credential_outcome, validate_request, ChatOptions, ChatOutput, LlmProvider};

#[derive(Debug)]
pub struct OllamaProvider {
    config: ModelConfig,
    session: HttpSession,
}

impl OllamaProvider {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate_for(ProviderKind::Ollama)?;
        let session = HttpSession::new("Ollama", config.request_timeout);
        Ok(Self { config, session })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{}", self.config.base_url(), endpoint)
    }

    /// Ollama only knows `user` and `assistant`; system prompts go in as user turns.
    fn request_body(&self, messages: &[Message], options: &ChatOptions) -> Value {
        let formatted: Vec<Value> = messages
            .iter()
            .map(|m| {
                let role = if m.role == Role::Assistant { "assistant" } else { "user" };
                json!({ "role": role, "content": m.content })
            })
            .collect();

        let mut generation = json!({ "temperature": options.temperature });
        if let Some(max) = options.max_tokens {
            generation["num_predict"] = json!(max);
        }

        json!({
            "model": self.config.name,
            "messages": formatted,
            "stream": false,
            "options": generation,
        })
    }

    async fn check_endpoint(&self) -> Result<()> {
        let client = self.session.client()?;

        let response = client.get(self.url("version")).send().await?;
        let body = ensure_success(response, "Ollama").await?.bytes().await?;
        let version: Value = serde_json::from_slice(&body)?;
        debug!(provider = "Ollama", version = %version, "Server reachable");

        let response = client
            .post(self.url("show"))
            .json(&json!({ "name": self.config.name }))
            .send()
            .await?;
        ensure_success(response, "Ollama")
            .await
            .map_err(|e| e.context(&format!("model {} not available", self.config.name)))?;

        info!(model = %self.config.name, "Connected to Ollama");
        Ok(())
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
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
        debug!(provider = "Ollama", body = %body, "Calling LLM");

        let client = self.session.client()?;
        let response = client
            .post(self.url("chat"))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response, "Ollama").await?;

        let data: Value = serde_json::from_slice(&response.bytes().await?)?;
        debug!(provider = "Ollama", response = %data, "LLM response received");

        data.pointer("/message/content")
            .and_then(Value::as_str)
            .map(|text| ChatOutput::Text(text.to_string()))
            .ok_or_else(|| LlmError::api("Ollama: invalid response format"))
    }

    async fn validate_credentials(&self) -> Result<bool> {
        credential_outcome("Ollama", self.check_endpoint().await)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
