//! LM Studio local server (OpenAI-compatible `/v1/chat/completions`).
//!
//! There is no streaming path: a streaming request still returns one
//! complete `ChatOutput::Text`.

use async_trait::async_trait;
use llmchat_core::types::Message;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ensure_success, LlmError, Result};
use crate::registry::{ModelConfig, ProviderKind};
use crate::session::HttpSession;
use crate::traits::{credential_outcome, validate_request, ChatOptions, ChatOutput, LlmProvider};

const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug)]
pub struct LmStudioProvider {
    config: ModelConfig,
    session: HttpSession,
}

impl LmStudioProvider {
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate_for(ProviderKind::LmStudio)?;
        let session = HttpSession::new("LM Studio", config.request_timeout);
        Ok(Self { config, session })
    }

    fn request_body(&self, messages: &[Message], options: &ChatOptions) -> Value {
        let formatted: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        json!({
            "messages": formatted,
            "model": self.config.name,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "stream": false,
        })
    }

    async fn check_endpoint(&self) -> Result<()> {
        let client = self.session.client()?;
        let response = client
            .get(format!("{}/v1/models", self.config.base_url()))
            .send()
            .await?;
        ensure_success(response, "LM Studio").await?;
        info!(base_url = self.config.base_url(), "Connected to LM Studio");
        Ok(())
    }
}

#[async_trait]
impl LlmProvider for LmStudioProvider {
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
        debug!(provider = "LM Studio", body = %body, "Calling LLM");

        let client = self.session.client()?;
        let response = client
            .post(format!("{}/v1/chat/completions", self.config.base_url()))
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response, "LM Studio").await?;

        let data: Value = serde_json::from_slice(&response.bytes().await?)?;
        debug!(provider = "LM Studio", response = %data, "LLM response received");

        data.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|text| ChatOutput::Text(text.to_string()))
            .ok_or_else(|| LlmError::api("LM Studio: invalid response format"))
    }

    async fn validate_credentials(&self) -> Result<bool> {
        credential_outcome("LM Studio", self.check_endpoint().await)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_provider(server: &MockServer) -> LmStudioProvider {
        let config = ModelConfig::new(ProviderKind::LmStudio).with_base_url(server.uri());
        LmStudioProvider::new(config).unwrap()
    }

    fn completion(content: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
    }

    #[test]
    fn test_request_body_defaults() {
        let provider = LmStudioProvider::new(ModelConfig::new(ProviderKind::LmStudio)).unwrap();
        let body = provider.request_body(
            &[Message::system("sys"), Message::user("hi")],
            &ChatOptions::default().streaming(true),
        );
        assert_eq!(body["model"], "llama2");
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn test_chat_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": "llama2", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Local hello")))
            .mount(&server)
            .await;

        let provider = make_provider(&server);
        let out = provider
            .chat_completion(&[Message::user("hello")], &ChatOptions::default())
            .await
            .unwrap();
        assert!(matches!(&out, ChatOutput::Text(t) if t == "Local hello"));
        provider.close();
    }

    #[tokio::test]
    async fn test_stream_request_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("whole reply")))
            .mount(&server)
            .await;

        let provider = make_provider(&server);
        let out = provider
            .chat_completion(&[Message::user("hello")], &ChatOptions::default().streaming(true))
            .await
            .unwrap();
        assert!(matches!(&out, ChatOutput::Text(t) if t == "whole reply"));
        provider.close();
    }

    #[tokio::test]
    async fn test_chat_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let provider = make_provider(&server);
        let err = provider
            .complete(&[Message::user("hello")], &ChatOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("model not loaded"));
        provider.close();
    }

    #[tokio::test]
    async fn test_empty_messages_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("x")))
            .expect(0)
            .mount(&server)
            .await;

        let provider = make_provider(&server);
        let err = provider
            .chat_completion(&[], &ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    #[tokio::test]
    async fn test_validate_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": "llama2" }] })),
            )
            .mount(&server)
            .await;

        let provider = make_provider(&server);
        assert!(provider.validate_credentials().await.unwrap());
        provider.close();
    }

    #[tokio::test]
    async fn test_validate_credentials_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = make_provider(&server);
        assert!(provider.validate_credentials().await.is_err());
        provider.close();
    }
}
