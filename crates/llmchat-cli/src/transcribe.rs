//! `llmchat transcribe` and `llmchat cleanup`: audio input.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tracing::warn;

use llmchat_core::audio::{is_audio_file, AudioStore};
use llmchat_core::config::load_config;
use llmchat_providers::{create_from_config, SpeechToText, WhisperTranscriber};

use crate::chat::ChatSettings;
use crate::ChatArgs;

/// Transcribe `file`; with `send`, use the transcript as a chat message.
pub async fn run(file: &Path, send: bool, args: ChatArgs) -> Result<()> {
    let config = load_config(None);
    if !config.app.audio_enabled {
        bail!("audio input is disabled (set audioEnabled in config.json)");
    }
    if !is_audio_file(&file.to_string_lossy()) {
        warn!(file = %file.display(), "File extension does not look like audio");
    }

    let store = AudioStore::in_temp_dir().context("failed to open audio directory")?;
    let transcriber = WhisperTranscriber::new(&config.transcription);
    let text = transcribe_staged(&store, &transcriber, file).await?;

    println!();
    println!("{} {}", "🎙".cyan(), text);

    if !send {
        println!();
        return Ok(());
    }
    if text.is_empty() {
        bail!("transcript is empty, nothing to send");
    }

    let settings = ChatSettings::resolve(&config, &args)?;
    let provider = create_from_config(&config, &settings.provider)
        .with_context(|| format!("cannot create provider '{}'", settings.provider))?;
    crate::send_once(provider.as_ref(), &config, &settings, &text).await
}

/// Stage `file` in the audio store, transcribe the staged copy, remove it.
async fn transcribe_staged(
    store: &AudioStore,
    transcriber: &dyn SpeechToText,
    file: &Path,
) -> Result<String> {
    let staged = store
        .stage(file)
        .with_context(|| format!("cannot read {}", file.display()))?;
    let result = transcriber.transcribe(&staged).await;
    store.remove(&staged);
    result.with_context(|| format!("{} transcription failed", transcriber.display_name()))
}

/// Remove temporary audio clips.
pub fn cleanup() -> Result<()> {
    let store = AudioStore::in_temp_dir().context("failed to open audio directory")?;
    let removed = store.cleanup();
    println!(
        "  {} removed {} audio file(s) from {}",
        "✓".green(),
        removed,
        store.dir().display()
    );
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
