//! One conversation with one provider: message list, history persistence,
//! streamed or complete replies.

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use tracing::{debug, warn};

use llmchat_core::config::Config;
use llmchat_core::history::{Conversation, HistoryStore};
use llmchat_core::types::Message;
use llmchat_core::utils::expand_home;
use llmchat_providers::{find_by_name, ChatOptions, ChatOutput, LlmProvider};

use crate::ChatArgs;

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// Command-line overrides merged with the provider's configured parameters.
#[derive(Clone, Debug)]
pub struct ChatSettings {
    /// Canonical provider name (e.g. `"lm_studio"`).
    pub provider: String,
    pub options: ChatOptions,
    pub conversation: String,
}

impl ChatSettings {
    pub fn resolve(config: &Config, args: &ChatArgs) -> Result<Self> {
        let requested = args
            .provider
            .as_deref()
            .unwrap_or(&config.app.default_provider);
        let Some(spec) = find_by_name(requested) else {
            bail!(
                "unknown provider '{requested}' \
                 (expected one of: mistral, gemini, deepseek, lm_studio, ollama)"
            );
        };

        let mut options = config
            .providers
            .get_by_name(spec.name)
            .map(|s| ChatOptions::from_parameters(&s.parameters))
            .unwrap_or_default()
            .streaming(args.stream);
        if let Some(t) = args.temperature {
            options.temperature = t;
        }
        if let Some(n) = args.max_tokens {
            options.max_tokens = Some(n);
        }

        Ok(Self {
            provider: spec.name.to_string(),
            options,
            conversation: args.conversation.clone(),
        })
    }
}

// ─────────────────────────────────────────────
// ChatSession
// ─────────────────────────────────────────────

pub struct ChatSession<'a> {
    provider: &'a dyn LlmProvider,
    options: ChatOptions,
    store: Option<HistoryStore>,
    conversation: Conversation,
}

impl<'a> ChatSession<'a> {
    /// Start a session, resuming saved history when `saveHistory` is on.
    pub fn open(
        provider: &'a dyn LlmProvider,
        config: &Config,
        settings: &ChatSettings,
    ) -> Result<Self> {
        let store = if config.app.save_history {
            let dir = expand_home(&config.app.history_path);
            let store = HistoryStore::new(&dir, config.app.max_history)
                .with_context(|| format!("failed to open history at {}", dir.display()))?;
            Some(store)
        } else {
            None
        };
        Ok(Self::with_store(provider, settings, store))
    }

    pub fn with_store(
        provider: &'a dyn LlmProvider,
        settings: &ChatSettings,
        store: Option<HistoryStore>,
    ) -> Self {
        let conversation = match &store {
            Some(store) => store.get_or_create(&settings.conversation),
            None => Conversation::new(settings.conversation.clone()),
        };
        debug!(
            conversation = %conversation.id,
            resumed = conversation.messages.len(),
            "chat session opened"
        );
        Self {
            provider,
            options: settings.options.clone(),
            store,
            conversation,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.conversation.messages
    }

    /// Send `text`, handing each reply fragment to `on_fragment` as it arrives.
    ///
    /// Returns the full reply. On failure the user message is dropped again so
    /// the conversation stays as it was.
    pub async fn send<F>(&mut self, text: &str, mut on_fragment: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        self.conversation.messages.push(Message::user(text));

        let reply = match self.request(&mut on_fragment).await {
            Ok(reply) => reply,
            Err(e) => {
                self.conversation.messages.pop();
                return Err(e);
            }
        };

        self.conversation.messages.push(Message::assistant(reply.clone()));
        self.persist();
        Ok(reply)
    }

    async fn request<F>(&self, on_fragment: &mut F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let output = self
            .provider
            .chat_completion(&self.conversation.messages, &self.options)
            .await?;

        match output {
            ChatOutput::Text(text) => {
                on_fragment(&text);
                Ok(text)
            }
            ChatOutput::Stream(mut stream) => {
                let mut reply = String::new();
                while let Some(fragment) = stream.next().await {
                    let fragment = fragment?;
                    on_fragment(&fragment);
                    reply.push_str(&fragment);
                }
                Ok(reply)
            }
        }
    }

    /// Forget every message in this conversation.
    pub fn clear(&mut self) -> Result<()> {
        self.conversation.messages.clear();
        if let Some(store) = &self.store {
            store
                .clear(&self.conversation.id)
                .context("failed to clear saved history")?;
        }
        Ok(())
    }

    fn persist(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        self.conversation.provider = Some(self.provider.config().provider.name().to_string());
        if let Err(e) = store.save(self.conversation.clone()) {
            warn!(error = %e, "failed to save conversation history");
        }
        // The store trims to max_history; keep the in-memory copy in step.
        self.conversation = store.get_or_create(&self.conversation.id);
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use llmchat_providers::{LmStudioProvider, ModelConfig, ProviderKind};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> ChatSettings {
        ChatSettings {
            provider: "lm_studio".to_string(),
            options: ChatOptions::default(),
            conversation: "cli:test".to_string(),
        }
    }

    fn provider(server: &MockServer) -> LmStudioProvider {
        LmStudioProvider::new(ModelConfig::new(ProviderKind::LmStudio).with_base_url(server.uri()))
            .unwrap()
    }

    async fn mount_reply(server: &MockServer, reply: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": reply } }]
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_resolve_defaults() {
        let mut config = Config::default();
        config.providers.gemini.parameters.temperature = 0.2;
        config.app.default_provider = "gemini".to_string();

        let resolved = ChatSettings::resolve(&config, &ChatArgs::default()).unwrap();
        assert_eq!(resolved.provider, "gemini");
        assert_eq!(resolved.options.temperature, 0.2);
        assert!(!resolved.options.stream);
    }

    #[test]
    fn test_resolve_overrides() {
        let args = ChatArgs {
            provider: Some("LM-Studio".to_string()),
            stream: true,
            temperature: Some(1.1),
            max_tokens: Some(50),
            conversation: "x".to_string(),
        };
        let resolved = ChatSettings::resolve(&Config::default(), &args).unwrap();
        assert_eq!(resolved.provider, "lm_studio");
        assert_eq!(resolved.options.temperature, 1.1);
        assert_eq!(resolved.options.max_tokens, Some(50));
        assert!(resolved.options.stream);
    }

    #[test]
    fn test_resolve_unknown_provider() {
        let args = ChatArgs {
            provider: Some("openai".to_string()),
            ..ChatArgs::default()
        };
        assert!(ChatSettings::resolve(&Config::default(), &args).is_err());
    }

    #[tokio::test]
    async fn test_send_keeps_context_and_persists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({
                "messages": [
                    { "role": "user", "content": "first" },
                    { "role": "assistant", "content": "reply" },
                    { "role": "user", "content": "second" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "content": "with context" } }]
            })))
            .mount(&server)
            .await;
        mount_reply(&server, "reply").await;

        let dir = tempfile::tempdir().unwrap();
        let provider = provider(&server);
        let store = HistoryStore::new(dir.path(), 100).unwrap();
        let mut session = ChatSession::with_store(&provider, &settings(), Some(store));

        let mut seen = String::new();
        assert_eq!(session.send("first", |f| seen.push_str(f)).await.unwrap(), "reply");
        assert_eq!(seen, "reply");
        assert_eq!(session.send("second", |_| {}).await.unwrap(), "with context");
        assert_eq!(session.messages().len(), 4);
        provider.close();

        let reloaded = HistoryStore::new(dir.path(), 100).unwrap().get_or_create("cli:test");
        assert_eq!(reloaded.messages.len(), 4);
        assert_eq!(reloaded.provider.as_deref(), Some("lm_studio"));
    }

    #[tokio::test]
    async fn test_failed_send_rolls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let provider = provider(&server);
        let mut session = ChatSession::with_store(&provider, &settings(), None);
        assert!(session.send("hello", |_| {}).await.is_err());
        assert!(session.messages().is_empty());
        provider.close();
    }

    #[tokio::test]
    async fn test_history_trimmed_and_clear() {
        let server = MockServer::start().await;
        mount_reply(&server, "ok").await;

        let dir = tempfile::tempdir().unwrap();
        let provider = provider(&server);
        let store = HistoryStore::new(dir.path(), 3).unwrap();
        let mut session = ChatSession::with_store(&provider, &settings(), Some(store));

        session.send("one", |_| {}).await.unwrap();
        session.send("two", |_| {}).await.unwrap();
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[0].content, "ok");

        session.clear().unwrap();
        assert!(session.messages().is_empty());
        provider.close();

        let reloaded = HistoryStore::new(dir.path(), 3).unwrap().get_or_create("cli:test");
        assert!(reloaded.messages.is_empty());
    }
}
