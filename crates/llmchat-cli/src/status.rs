//! `llmchat status`: show configuration and provider status.
//!
//! - Shows config path, default provider, history and audio settings
//! - Shows key or endpoint status for each provider

use anyhow::Result;
use colored::Colorize;

use llmchat_core::config::{load_config, Config, ProviderSettings};
use llmchat_core::utils::{expand_home, get_config_path, get_data_path};
use llmchat_providers::registry::{ModelKind, ProviderSpec, PROVIDERS};
use llmchat_providers::WhisperTranscriber;

use crate::helpers::{mark, mask_key};

/// Run the status command.
pub fn run() -> Result<()> {
    let config = load_config(None);
    let config_path = get_config_path();

    println!();
    println!("{}", "💬 llm-chat Status".cyan().bold());
    println!();

    println!(
        "  {:<18} {} {}",
        "Config:".bold(),
        config_path.display(),
        if config_path.exists() {
            mark(true)
        } else {
            "(not found)".red().to_string()
        }
    );
    println!("  {:<18} {}", "Data dir:".bold(), get_data_path().display());
    println!(
        "  {:<18} {}",
        "Default provider:".bold(),
        config.app.default_provider
    );

    let history_dir = expand_home(&config.app.history_path);
    if config.app.save_history {
        println!(
            "  {:<18} {} (max {} messages)",
            "History:".bold(),
            history_dir.display(),
            config.app.max_history
        );
    } else {
        println!("  {:<18} {}", "History:".bold(), "disabled".dimmed());
    }

    println!(
        "  {:<18} {}",
        "Audio:".bold(),
        if config.app.audio_enabled {
            "enabled".to_string()
        } else {
            "disabled".dimmed().to_string()
        }
    );

    println!();
    println!("  {}", "Providers:".bold());
    for spec in PROVIDERS {
        let Some(settings) = config.providers.get_by_name(spec.name) else {
            continue;
        };
        println!(
            "    {:<12} {:<28} {}",
            spec.display_name,
            model_name(spec, settings),
            provider_status(spec, settings)
        );
    }

    println!();
    let transcriber = WhisperTranscriber::new(&config.transcription);
    println!(
        "  {:<18} {} {}",
        "Transcription:".bold(),
        config.transcription.model,
        if transcriber.is_configured() {
            mark(true)
        } else {
            format!("{} {}", mark(false), "no API key (set GROQ_API_KEY)".dimmed())
        }
    );
    println!();

    print_hint(&config);
    Ok(())
}

fn model_name<'a>(spec: &'a ProviderSpec, settings: &'a ProviderSettings) -> &'a str {
    settings
        .model
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(spec.default_model)
}

/// One-line key or endpoint status for a provider.
fn provider_status(spec: &ProviderSpec, settings: &ProviderSettings) -> String {
    match spec.kind.model_kind() {
        ModelKind::Api if settings.has_api_key() => {
            format!("{} key {}", mark(true), mask_key(&settings.api_key))
        }
        ModelKind::Api => format!(
            "{} not set ({})",
            mark(false),
            spec.env_key.unwrap_or("apiKey")
        ),
        ModelKind::Local => {
            let url = settings
                .base_url
                .as_deref()
                .unwrap_or(spec.default_base_url);
            format!("{} {}", "→".dimmed(), url)
        }
    }
}

fn print_hint(config: &Config) {
    let any_key = config
        .providers
        .iter()
        .any(|(_, settings)| settings.has_api_key());
    if !any_key {
        println!(
            "  {}",
            "No API keys configured. Add them to ~/.llm-chat/config.json or .env.".yellow()
        );
        println!("  {}", "Local providers (LM Studio, Ollama) need no key.".yellow());
        println!();
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
