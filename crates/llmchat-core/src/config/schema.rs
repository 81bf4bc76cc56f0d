//! Configuration schema.
//!
//! Hierarchy: `Config` → `AppConfig`, `ProvidersConfig`, `TranscriptionConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! Per-provider settings only hold what the user overrides; model names and base URLs
//! fall back to the provider registry defaults when left unset.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.llm-chat/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub app: AppConfig,
    pub providers: ProvidersConfig,
    pub transcription: TranscriptionConfig,
}

// ─────────────────────────────────────────────
// App
// ─────────────────────────────────────────────

/// Application-wide settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// UI theme name.
    pub theme: String,
    /// Whether audio input (transcription) is offered.
    pub audio_enabled: bool,
    /// Persist conversations to `history_path`.
    pub save_history: bool,
    /// Directory for saved conversations (`~` is expanded).
    pub history_path: String,
    /// Maximum number of messages kept per saved conversation.
    pub max_history: usize,
    /// Provider used when none is given on the command line.
    pub default_provider: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            audio_enabled: true,
            save_history: true,
            history_path: "~/.llm-chat/history".to_string(),
            max_history: 100,
            default_provider: "mistral".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Generation parameters for one model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelParameters {
    /// Sampling temperature (>= 0.0).
    pub temperature: f64,
    /// Maximum tokens to generate; provider default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
        }
    }
}

/// User settings for a single provider.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    /// API key for hosted providers.
    pub api_key: String,
    /// Custom base URL (overrides the provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name (overrides the provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub parameters: ModelParameters,
    /// Client-wide request timeout. No timeout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl ProviderSettings {
    /// Whether an API key is set.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Settings for every supported backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    pub mistral: ProviderSettings,
    pub gemini: ProviderSettings,
    pub deepseek: ProviderSettings,
    pub lm_studio: ProviderSettings,
    pub ollama: ProviderSettings,
}

impl ProvidersConfig {
    /// Provider names in declaration order.
    pub const NAMES: [&'static str; 5] = ["mistral", "gemini", "deepseek", "lm_studio", "ollama"];

    /// Get a provider's settings by name (e.g. `"lm_studio"`).
    pub fn get_by_name(&self, name: &str) -> Option<&ProviderSettings> {
        match name {
            "mistral" => Some(&self.mistral),
            "gemini" => Some(&self.gemini),
            "deepseek" => Some(&self.deepseek),
            "lm_studio" => Some(&self.lm_studio),
            "ollama" => Some(&self.ollama),
            _ => None,
        }
    }

    /// Mutable access by name.
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut ProviderSettings> {
        match name {
            "mistral" => Some(&mut self.mistral),
            "gemini" => Some(&mut self.gemini),
            "deepseek" => Some(&mut self.deepseek),
            "lm_studio" => Some(&mut self.lm_studio),
            "ollama" => Some(&mut self.ollama),
            _ => None,
        }
    }

    /// Iterate over `(name, settings)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ProviderSettings)> {
        Self::NAMES
            .into_iter()
            .filter_map(move |name| self.get_by_name(name).map(|s| (name, s)))
    }
}

// ─────────────────────────────────────────────
// Transcription
// ─────────────────────────────────────────────

/// Speech-to-text configuration (OpenAI-compatible Whisper endpoint).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionConfig {
    /// API key; falls back to `GROQ_API_KEY` when empty.
    pub api_key: String,
    /// Full transcription endpoint URL.
    pub api_url: String,
    /// Whisper model name.
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.groq.com/openai/v1/audio/transcriptions".to_string(),
            model: "whisper-large-v3".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
