//! `llmchat validate`: check a provider's credentials or endpoint.

use anyhow::{Context, Result};
use colored::Colorize;

use llmchat_core::config::load_config;
use llmchat_providers::{create_from_config, LlmProvider};

/// Run the validate command.
pub async fn run(provider: Option<String>) -> Result<()> {
    let config = load_config(None);
    let name = provider.unwrap_or_else(|| config.app.default_provider.clone());
    let provider = create_from_config(&config, &name)
        .with_context(|| format!("cannot create provider '{name}'"))?;

    println!();
    let accepted = check(provider.as_ref()).await;
    match &accepted {
        Ok(true) => println!(
            "  {} {} accepted the credentials ({})",
            "✓".green(),
            provider.display_name(),
            provider.config().name
        ),
        Ok(false) => println!(
            "  {} {} rejected the credentials",
            "✗".red(),
            provider.display_name()
        ),
        Err(e) => println!(
            "  {} {} could not be checked: {e}",
            "✗".red(),
            provider.display_name()
        ),
    }
    println!();

    match accepted {
        Ok(true) => Ok(()),
        Ok(false) => anyhow::bail!("credentials rejected"),
        Err(e) => Err(e.into()),
    }
}

/// Validate and release the HTTP session.
async fn check(provider: &dyn LlmProvider) -> llmchat_providers::Result<bool> {
    let result = provider.validate_credentials().await;
    provider.close();
    result
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use llmchat_providers::{ModelConfig, OllamaProvider, ProviderKind, SessionState};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn check_closes_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "0.5.0" })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let provider =
            OllamaProvider::new(ModelConfig::new(ProviderKind::Ollama).with_base_url(server.uri()))
                .unwrap();
        assert!(check(&provider).await.unwrap());
        assert_ne!(provider.state(), SessionState::Initialized);
    }

    #[tokio::test]
    async fn check_reports_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let provider =
            OllamaProvider::new(ModelConfig::new(ProviderKind::Ollama).with_base_url(server.uri()))
                .unwrap();
        assert!(!check(&provider).await.unwrap());
    }
}
