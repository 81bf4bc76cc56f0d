//! LLM provider trait: the contract every backend implements.
//!
//! Hosted APIs (Gemini, Mistral, DeepSeek) and local servers (LM Studio, Ollama)
//! all expose `chat_completion` and `validate_credentials`; session lifecycle
//! (`initialize`, `close`, `state`) is shared through provided methods.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use llmchat_core::config::ModelParameters;
use llmchat_core::types::{is_chronological, Message};
use tracing::{info, warn};

use crate::error::{LlmError, Result};
use crate::registry::ModelConfig;
use crate::session::{HttpSession, SessionState};

/// Lazy, finite stream of reply fragments in arrival order.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Per-call generation options.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatOptions {
    /// Sampling temperature (finite, >= 0.0).
    pub temperature: f64,
    /// Maximum tokens to generate. Provider default when unset.
    pub max_tokens: Option<u32>,
    /// Ask for a fragment stream instead of one complete reply.
    pub stream: bool,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
            stream: false,
        }
    }
}

impl ChatOptions {
    /// Options seeded from a model's configured parameters.
    pub fn from_parameters(parameters: &ModelParameters) -> Self {
        Self {
            temperature: parameters.temperature,
            max_tokens: parameters.max_tokens,
            stream: false,
        }
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Result of a chat completion.
pub enum ChatOutput {
    Text(String),
    Stream(TextStream),
}

impl ChatOutput {
    /// Full reply text, draining the stream if there is one.
    pub async fn into_text(self) -> Result<String> {
        match self {
            ChatOutput::Text(text) => Ok(text),
            ChatOutput::Stream(mut stream) => {
                let mut text = String::new();
                while let Some(fragment) = stream.next().await {
                    text.push_str(&fragment?);
                }
                Ok(text)
            }
        }
    }
}

impl std::fmt::Debug for ChatOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatOutput::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ChatOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Check call arguments before anything touches the network.
pub fn validate_request(messages: &[Message], options: &ChatOptions) -> Result<()> {
    if messages.is_empty() {
        return Err(LlmError::validation("message list cannot be empty"));
    }
    if !is_chronological(messages) {
        return Err(LlmError::validation(
            "messages must be in chronological order (oldest first)",
        ));
    }
    if !options.temperature.is_finite() || options.temperature < 0.0 {
        return Err(LlmError::validation(format!(
            "temperature must be a finite value >= 0.0, got {}",
            options.temperature
        )));
    }
    if options.max_tokens == Some(0) {
        return Err(LlmError::validation("max_tokens must be greater than 0"));
    }
    Ok(())
}

/// Map a credential check to the `validate_credentials` contract:
/// success → `true`, backend rejection → `false`, anything else → error.
pub(crate) fn credential_outcome(provider: &str, check: Result<()>) -> Result<bool> {
    match check {
        Ok(()) => Ok(true),
        Err(e) if e.is_auth_rejection() => {
            warn!(provider, error = %e, "Credentials rejected");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Trait that all LLM providers implement.
///
/// A provider is bound to one [`ModelConfig`] for its lifetime and owns one
/// [`HttpSession`]. Calls are expected one at a time.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// The configuration this instance was built with.
    fn config(&self) -> &ModelConfig;

    /// The provider's HTTP session.
    fn session(&self) -> &HttpSession;

    /// Display name for logging.
    fn display_name(&self) -> &str {
        self.config().provider.spec().display_name
    }

    /// Send a chat completion request.
    ///
    /// Invalid arguments fail with [`LlmError::Validation`] before any request
    /// is made. A closed or never-opened session is reopened transparently.
    async fn chat_completion(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatOutput>;

    /// Lightweight round trip confirming the credential or endpoint works.
    ///
    /// `Ok(false)` means the backend rejected the credential.
    async fn validate_credentials(&self) -> Result<bool>;

    fn state(&self) -> SessionState {
        self.session().state()
    }

    /// Open the session and check credentials. No-op when already open.
    async fn initialize(&self) -> Result<()> {
        if self.state() == SessionState::Initialized {
            return Ok(());
        }

        self.session().client()?;
        let context = format!("{} initialization failed", self.display_name());
        match self.validate_credentials().await {
            Ok(true) => {
                info!(
                    provider = self.display_name(),
                    model = %self.config().name,
                    "Provider initialized"
                );
                Ok(())
            }
            Ok(false) => {
                self.session().close();
                Err(LlmError::api(format!("{context}: credentials rejected")))
            }
            Err(e) => {
                self.session().close();
                Err(match e {
                    LlmError::Validation(message) => LlmError::api(message),
                    other => other,
                }
                .context(&context))
            }
        }
    }

    /// Release the HTTP session. Safe to call repeatedly.
    fn close(&self) {
        self.session().close();
    }

    /// Convenience: run a completion and collect the whole reply.
    async fn complete(&self, messages: &[Message], options: &ChatOptions) -> Result<String> {
        self.chat_completion(messages, options).await?.into_text().await
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use futures_util::stream;
    use llmchat_core::Role;

    #[test]
    fn test_validate_empty_messages() {
        let err = validate_request(&[], &ChatOptions::default()).unwrap_err();
        assert!(matches!(err, LlmError::Validation(_)));
    }

    #[test]
    fn test_validate_order() {
        let now = Utc::now();
        let messages = vec![
            Message::at(Role::User, "second", now),
            Message::at(Role::Assistant, "first", now - Duration::seconds(5)),
        ];
        assert!(validate_request(&messages, &ChatOptions::default()).is_err());
    }

    #[test]
    fn test_validate_temperature_and_tokens() {
        let messages = vec![Message::user("hi")];
        let mut options = ChatOptions::default();
        assert!(validate_request(&messages, &options).is_ok());

        options.temperature = -0.1;
        assert!(validate_request(&messages, &options).is_err());
        options.temperature = f64::NAN;
        assert!(validate_request(&messages, &options).is_err());
        options.temperature = 1.5;
        assert!(validate_request(&messages, &options).is_ok());

        options.max_tokens = Some(0);
        assert!(validate_request(&messages, &options).is_err());
    }

    #[test]
    fn test_options_from_parameters() {
        let params = ModelParameters {
            temperature: 0.3,
            max_tokens: Some(64),
        };
        let options = ChatOptions::from_parameters(&params).streaming(true);
        assert_eq!(options.temperature, 0.3);
        assert_eq!(options.max_tokens, Some(64));
        assert!(options.stream);
    }

    #[test]
    fn test_credential_outcome() {
        assert!(credential_outcome("t", Ok(())).unwrap());
        let rejected = LlmError::Api {
            status: Some(401),
            message: "nope".into(),
        };
        assert!(!credential_outcome("t", Err(rejected)).unwrap());
        let broken = LlmError::Api {
            status: Some(500),
            message: "down".into(),
        };
        assert!(credential_outcome("t", Err(broken)).is_err());
    }

    #[tokio::test]
    async fn test_into_text_collects_stream() {
        let fragments: Vec<Result<String>> = vec![Ok("Hel".into()), Ok("lo".into())];
        let output = ChatOutput::Stream(stream::iter(fragments).boxed());
        assert_eq!(output.into_text().await.unwrap(), "Hello");

        let output = ChatOutput::Text("plain".into());
        assert_eq!(output.into_text().await.unwrap(), "plain");
    }

    #[tokio::test]
    async fn test_into_text_propagates_stream_error() {
        let fragments: Vec<Result<String>> = vec![Ok("a".into()), Err(LlmError::api("cut"))];
        let output = ChatOutput::Stream(stream::iter(fragments).boxed());
        assert!(output.into_text().await.is_err());
    }
}
