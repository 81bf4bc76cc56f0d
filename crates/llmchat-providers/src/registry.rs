//! Provider registry: static specs for the five supported backends, the
//! per-instance `ModelConfig`, and the provider factory.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use llmchat_core::config::{Config, ModelParameters, ProviderSettings};
use tracing::debug;

use crate::error::{LlmError, Result};
use crate::gemini::GeminiProvider;
use crate::lm_studio::LmStudioProvider;
use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;

// ─────────────────────────────────────────────
// ProviderKind / ModelKind
// ─────────────────────────────────────────────

/// Supported backends (closed set).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Mistral,
    Gemini,
    DeepSeek,
    LmStudio,
    Ollama,
}

/// Whether a model is reached through a hosted API or a local server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    Api,
    Local,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::Mistral,
        ProviderKind::Gemini,
        ProviderKind::DeepSeek,
        ProviderKind::LmStudio,
        ProviderKind::Ollama,
    ];

    /// Static spec for this provider.
    pub fn spec(self) -> &'static ProviderSpec {
        match self {
            ProviderKind::Mistral => &PROVIDERS[0],
            ProviderKind::Gemini => &PROVIDERS[1],
            ProviderKind::DeepSeek => &PROVIDERS[2],
            ProviderKind::LmStudio => &PROVIDERS[3],
            ProviderKind::Ollama => &PROVIDERS[4],
        }
    }

    /// Config name (e.g. `"lm_studio"`).
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn model_kind(self) -> ModelKind {
        match self {
            ProviderKind::Mistral | ProviderKind::Gemini | ProviderKind::DeepSeek => ModelKind::Api,
            ProviderKind::LmStudio | ProviderKind::Ollama => ModelKind::Local,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        find_by_name(s)
            .map(|spec| spec.kind)
            .ok_or_else(|| LlmError::validation(format!("unknown provider '{s}'")))
    }
}

// ─────────────────────────────────────────────
// ProviderSpec
// ─────────────────────────────────────────────

/// Static specification describing one backend.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    pub kind: ProviderKind,
    /// Internal name, also the config key (snake_case).
    pub name: &'static str,
    /// Human-readable name for logs and the CLI.
    pub display_name: &'static str,
    /// Environment variable for the API key (hosted providers only).
    pub env_key: Option<&'static str>,
    /// Model used when the config leaves it unset.
    pub default_model: &'static str,
    /// Base URL used when the config leaves it unset.
    pub default_base_url: &'static str,
}

/// All supported providers, in `ProviderKind` declaration order.
pub static PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        kind: ProviderKind::Mistral,
        name: "mistral",
        display_name: "Mistral",
        env_key: Some("MISTRAL_API_KEY"),
        default_model: "codestral-2501",
        default_base_url: "https://codestral.mistral.ai/v1",
    },
    ProviderSpec {
        kind: ProviderKind::Gemini,
        name: "gemini",
        display_name: "Gemini",
        env_key: Some("GEMINI_API_KEY"),
        default_model: "gemini-pro",
        default_base_url: "https://generativelanguage.googleapis.com/v1",
    },
    ProviderSpec {
        kind: ProviderKind::DeepSeek,
        name: "deepseek",
        display_name: "DeepSeek",
        env_key: Some("DEEPSEEK_API_KEY"),
        default_model: "deepseek-chat",
        default_base_url: "https://api.deepseek.com/v1",
    },
    ProviderSpec {
        kind: ProviderKind::LmStudio,
        name: "lm_studio",
        display_name: "LM Studio",
        env_key: None,
        default_model: "llama2",
        default_base_url: "http://localhost:1234",
    },
    ProviderSpec {
        kind: ProviderKind::Ollama,
        name: "ollama",
        display_name: "Ollama",
        env_key: None,
        default_model: "mistral",
        default_base_url: "http://localhost:11434",
    },
];

/// Find a provider spec by name. Accepts `lm_studio`, `lm-studio` and `lmstudio`.
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    let normalized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect();
    PROVIDERS
        .iter()
        .find(|spec| spec.name.replace('_', "") == normalized)
}

// ─────────────────────────────────────────────
// ModelConfig
// ─────────────────────────────────────────────

/// Everything a provider instance needs; read-only once built.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub name: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub parameters: ModelParameters,
    pub request_timeout: Option<Duration>,
}

impl ModelConfig {
    /// Config with the registry defaults for `provider`.
    pub fn new(provider: ProviderKind) -> Self {
        let spec = provider.spec();
        let base_url = match provider.model_kind() {
            ModelKind::Local => Some(spec.default_base_url.to_string()),
            ModelKind::Api => None,
        };
        ModelConfig {
            provider,
            name: spec.default_model.to_string(),
            api_key: None,
            base_url,
            parameters: ModelParameters::default(),
            request_timeout: None,
        }
    }

    /// Build from user settings, falling back to registry defaults.
    pub fn from_settings(provider: ProviderKind, settings: &ProviderSettings) -> Self {
        let mut config = Self::new(provider);
        if let Some(model) = settings.model.as_deref().filter(|m| !m.trim().is_empty()) {
            config.name = model.to_string();
        }
        if settings.has_api_key() {
            config.api_key = Some(settings.api_key.trim().to_string());
        }
        if let Some(url) = settings.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            config.base_url = Some(url.trim().to_string());
        }
        config.parameters = settings.parameters.clone();
        config.request_timeout = settings.request_timeout_secs.map(Duration::from_secs);
        config
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn kind(&self) -> ModelKind {
        self.provider.model_kind()
    }

    /// Base URL without trailing slash (config value or registry default).
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(self.provider.spec().default_base_url)
            .trim_end_matches('/')
    }

    /// API key, empty when unset.
    pub fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    /// Check the invariants for this config's model kind.
    pub fn validate(&self) -> Result<()> {
        let display = self.provider.spec().display_name;
        if self.name.trim().is_empty() {
            return Err(LlmError::validation(format!("model name required for {display}")));
        }
        match self.kind() {
            ModelKind::Api if self.api_key().trim().is_empty() => Err(LlmError::validation(
                format!("API key required for {display}"),
            )),
            ModelKind::Local
                if self
                    .base_url
                    .as_deref()
                    .map_or(true, |u| u.trim().is_empty()) =>
            {
                Err(LlmError::validation(format!("base URL required for {display}")))
            }
            _ => Ok(()),
        }
    }

    /// Reject a config that belongs to another provider, then validate it.
    pub(crate) fn validate_for(&self, expected: ProviderKind) -> Result<()> {
        if self.provider != expected {
            return Err(LlmError::validation(format!(
                "invalid configuration for {}: got {}",
                expected.spec().display_name,
                self.provider.spec().display_name
            )));
        }
        self.validate()
    }
}

// ─────────────────────────────────────────────
// Factory
// ─────────────────────────────────────────────

/// Build the provider matching `config.provider`.
pub fn create_provider(config: ModelConfig) -> Result<Box<dyn LlmProvider>> {
    debug!(
        provider = config.provider.name(),
        model = %config.name,
        base_url = config.base_url(),
        "Creating LLM provider"
    );

    Ok(match config.provider {
        ProviderKind::Mistral | ProviderKind::DeepSeek => {
            Box::new(OpenAiCompatProvider::new(config)?)
        }
        ProviderKind::Gemini => Box::new(GeminiProvider::new(config)?),
        ProviderKind::LmStudio => Box::new(LmStudioProvider::new(config)?),
        ProviderKind::Ollama => Box::new(OllamaProvider::new(config)?),
    })
}

/// Look up `name` in the app config and build that provider.
pub fn create_from_config(config: &Config, name: &str) -> Result<Box<dyn LlmProvider>> {
    let kind: ProviderKind = name.parse()?;
    let settings = config
        .providers
        .get_by_name(kind.name())
        .cloned()
        .unwrap_or_default();
    create_provider(ModelConfig::from_settings(kind, &settings))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
