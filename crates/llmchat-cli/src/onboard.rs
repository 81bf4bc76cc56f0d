//! `llmchat onboard`: initialize configuration and data directories.
//!
//! - Creates `~/.llm-chat/config.json` with defaults
//! - Creates the history directory and the audio scratch directory

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use llmchat_core::audio::AudioStore;
use llmchat_core::config::{load_config, save_config, Config};
use llmchat_core::utils::{expand_home, get_config_path};

/// Run the onboard command.
pub fn run() -> Result<()> {
    println!();
    println!("{}", "💬 llm-chat Setup".cyan().bold());
    println!();

    // 1. Config
    let config_path = get_config_path();
    if create_config_if_missing(&config_path)? {
        println!("  {} created config at {}", "✓".green(), config_path.display());
    } else {
        println!(
            "  {} config already exists at {}",
            "✓".green(),
            config_path.display()
        );
    }

    let config = load_config(Some(&config_path));

    // 2. History
    let history_dir = expand_home(&config.app.history_path);
    std::fs::create_dir_all(&history_dir)
        .with_context(|| format!("failed to create {}", history_dir.display()))?;
    println!("  {} history dir at {}", "✓".green(), history_dir.display());

    // 3. Audio scratch space
    let audio = AudioStore::in_temp_dir().context("failed to create audio directory")?;
    println!("  {} audio dir at {}", "✓".green(), audio.dir().display());

    println!();
    println!(
        "{}",
        "  Setup complete! Add an API key (or start LM Studio / Ollama), then run `llmchat chat`."
            .green()
    );
    println!();

    Ok(())
}

/// Write a default config to `path` unless one is already there.
///
/// Returns whether a file was written.
fn create_config_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
