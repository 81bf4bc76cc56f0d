//! Speech-to-text via OpenAI-compatible Whisper endpoints.
//!
//! Defaults to Groq's hosted Whisper API. Any `/audio/transcriptions`
//! endpoint accepting a multipart `file` + `model` upload works.

use std::path::Path;

use async_trait::async_trait;
use llmchat_core::config::schema::TranscriptionConfig;
use tracing::{debug, warn};

use crate::error::{ensure_success, LlmError, Result};

// ─────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────

/// Trait for speech-to-text backends.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an audio file to text.
    async fn transcribe(&self, file_path: &Path) -> Result<String>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

// ─────────────────────────────────────────────
// Whisper
// ─────────────────────────────────────────────

/// Whisper transcription over HTTP multipart.
pub struct WhisperTranscriber {
    api_key: String,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    /// Build from config. An empty key falls back to `GROQ_API_KEY`.
    pub fn new(config: &TranscriptionConfig) -> Self {
        let api_key = if config.api_key.trim().is_empty() {
            std::env::var("GROQ_API_KEY").unwrap_or_default()
        } else {
            config.api_key.trim().to_string()
        };

        Self {
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Check if the transcriber has an API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, file_path: &Path) -> Result<String> {
        if !self.is_configured() {
            return Err(LlmError::validation(
                "no transcription API key configured (set GROQ_API_KEY)",
            ));
        }

        if !file_path.is_file() {
            warn!(path = %file_path.display(), "transcription: file not found");
            return Err(LlmError::validation(format!(
                "audio file not found: {}",
                file_path.display()
            )));
        }

        let file_name = file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        debug!(
            path = %file_path.display(),
            model = %self.model,
            "transcribing audio"
        );

        let file_bytes = tokio::fs::read(file_path)
            .await
            .map_err(|e| {
                LlmError::validation(format!("cannot read {}: {e}", file_path.display()))
            })?;

        let file_part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response, "Whisper").await?;

        let json: serde_json::Value = serde_json::from_slice(&response.bytes().await?)?;
        let text = json["text"]
            .as_str()
            .ok_or_else(|| LlmError::api("Whisper: response has no text"))?
            .trim()
            .to_string();

        debug!(chars = text.len(), "transcription complete");
        Ok(text)
    }

    fn display_name(&self) -> &str {
        "Whisper"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
