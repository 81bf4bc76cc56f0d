//! LLM provider layer for llm-chat.
//!
//! # Architecture
//!
//! - [`traits::LlmProvider`]: contract every backend implements
//! - [`session`]: HTTP session lifecycle and the `ProviderScope` guard
//! - [`registry`]: static specs for the five backends, `ModelConfig`, `create_provider`
//! - [`streaming`]: newline-delimited JSON / SSE body decoding
//! - [`gemini`], [`openai_compat`], [`lm_studio`], [`ollama`]: concrete clients
//! - [`transcription`]: Whisper speech-to-text

pub mod error;
pub mod gemini;
pub mod lm_studio;
pub mod ollama;
pub mod openai_compat;
pub mod registry;
pub mod session;
pub mod streaming;
pub mod traits;
pub mod transcription;

// Re-export main types for convenience
pub use error::{LlmError, Result};
pub use gemini::GeminiProvider;
pub use lm_studio::LmStudioProvider;
pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use registry::{
    create_from_config, create_provider, find_by_name, ModelConfig, ModelKind, ProviderKind,
    ProviderSpec, PROVIDERS,
};
pub use session::{with_provider, HttpSession, ProviderScope, SessionState};
pub use traits::{ChatOptions, ChatOutput, LlmProvider, TextStream};
pub use transcription::{SpeechToText, WhisperTranscriber};
