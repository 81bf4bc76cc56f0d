//! `llmchat params`: persist generation parameters for one provider.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use llmchat_core::config::{
    read_config_file, save_config, update_model_parameters, ModelParameters,
};
use llmchat_core::utils::get_config_path;
use llmchat_providers::find_by_name;

/// Run the params command against the default config file.
pub fn run(provider: &str, temperature: Option<f64>, max_tokens: Option<u32>) -> Result<()> {
    let path = get_config_path();
    let (name, parameters) = update_file(&path, provider, temperature, max_tokens)?;

    println!();
    println!(
        "  {} {} parameters saved to {}",
        "✓".green(),
        name,
        path.display()
    );
    println!("    temperature: {}", parameters.temperature);
    match parameters.max_tokens {
        Some(n) => println!("    max tokens:  {n}"),
        None => println!("    max tokens:  {}", "provider default".dimmed()),
    }
    println!();
    Ok(())
}

/// Validate, apply and save. Returns the canonical provider name and the
/// resulting parameters.
fn update_file(
    path: &Path,
    provider: &str,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
) -> Result<(&'static str, ModelParameters)> {
    if temperature.is_none() && max_tokens.is_none() {
        bail!("nothing to update: pass --temperature and/or --max-tokens");
    }
    if let Some(t) = temperature {
        if !t.is_finite() || t < 0.0 {
            bail!("temperature must be a number >= 0, got {t}");
        }
    }
    if max_tokens == Some(0) {
        bail!("max tokens must be greater than 0");
    }
    let Some(spec) = find_by_name(provider) else {
        bail!("unknown provider '{provider}'");
    };

    let mut config = read_config_file(path)
        .with_context(|| format!("cannot read {}; fix it before updating", path.display()))?;
    if !update_model_parameters(&mut config, spec.name, temperature, max_tokens) {
        bail!("unknown provider '{provider}'");
    }
    save_config(&config, Some(path))
        .with_context(|| format!("failed to write {}", path.display()))?;

    let parameters = config
        .providers
        .get_by_name(spec.name)
        .map(|s| s.parameters.clone())
        .unwrap_or_default();
    Ok((spec.name, parameters))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
