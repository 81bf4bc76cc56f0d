//! Config loader: reads `~/.llm-chat/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.llm-chat/config.json`
//! 3. Environment variables (override JSON), either the `LLMCHAT_<SECTION>__<FIELD>`
//!    form or the short `.env` names (`GEMINI_API_KEY`, `OLLAMA_URL`, ...)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, ProviderSettings};
use crate::utils::get_config_path;

/// Load configuration from `path` (or the default path) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    apply_env_overrides(load_config_file(&config_path))
}

/// Read the JSON file only, without env overrides.
///
/// Falls back to `Config::default()` when the file is missing or unreadable.
pub fn load_config_file(path: &Path) -> Config {
    match read_config_file(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Read the JSON file only, without env overrides, reporting parse errors.
///
/// A missing file yields `Config::default()`. Commands that write the config
/// back start from this so a broken file is never overwritten.
pub fn read_config_file(path: &Path) -> std::io::Result<Config> {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    debug!("Loading config from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Update one provider's generation parameters in place.
///
/// Returns `false` when `provider` is not a known provider name.
pub fn update_model_parameters(
    config: &mut Config,
    provider: &str,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
) -> bool {
    let Some(settings) = config.providers.get_by_name_mut(provider) else {
        return false;
    };
    if let Some(t) = temperature {
        settings.parameters.temperature = t;
    }
    if let Some(n) = max_tokens {
        settings.parameters.max_tokens = Some(n);
    }
    debug!(provider, ?temperature, ?max_tokens, "Model parameters updated");
    true
}

/// Apply environment variable overrides from the process environment.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary variable lookup.
///
/// Supported variables:
/// - `LLMCHAT_PROVIDERS__<NAME>__API_KEY` / `__BASE_URL` / `__MODEL`
/// - `MISTRAL_API_KEY`, `GEMINI_API_KEY`, `DEEPSEEK_API_KEY`
/// - `LM_STUDIO_URL`, `OLLAMA_URL`
/// - `DEFAULT_MODEL` → `app.default_provider`
/// - `DEFAULT_TEMPERATURE`, `DEFAULT_MAX_TOKENS` → every provider's parameters
/// - `AUDIO_ENABLED`, `SAVE_HISTORY`, `MAX_HISTORY`
/// - `LLMCHAT_APP__HISTORY_PATH`
/// - `GROQ_API_KEY` → `transcription.api_key` when it is empty
pub fn apply_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    // Short .env names first so the namespaced form wins.
    set_key(&mut config.providers.mistral, lookup("MISTRAL_API_KEY"));
    set_key(&mut config.providers.gemini, lookup("GEMINI_API_KEY"));
    set_key(&mut config.providers.deepseek, lookup("DEEPSEEK_API_KEY"));
    if let Some(url) = lookup("LM_STUDIO_URL") {
        config.providers.lm_studio.base_url = Some(url);
    }
    if let Some(url) = lookup("OLLAMA_URL") {
        config.providers.ollama.base_url = Some(url);
    }

    for (name, env_name) in [
        ("mistral", "MISTRAL"),
        ("gemini", "GEMINI"),
        ("deepseek", "DEEPSEEK"),
        ("lm_studio", "LM_STUDIO"),
        ("ollama", "OLLAMA"),
    ] {
        if let Some(settings) = config.providers.get_by_name_mut(name) {
            apply_provider_env(settings, env_name, &lookup);
        }
    }

    if let Some(val) = lookup("DEFAULT_TEMPERATURE") {
        match val.parse::<f64>() {
            Ok(t) => {
                for name in super::schema::ProvidersConfig::NAMES {
                    update_model_parameters(&mut config, name, Some(t), None);
                }
            }
            Err(_) => warn!("Ignoring invalid DEFAULT_TEMPERATURE={}", val),
        }
    }
    if let Some(val) = lookup("DEFAULT_MAX_TOKENS") {
        match val.parse::<u32>() {
            Ok(n) if n > 0 => {
                for name in super::schema::ProvidersConfig::NAMES {
                    update_model_parameters(&mut config, name, None, Some(n));
                }
            }
            _ => warn!("Ignoring invalid DEFAULT_MAX_TOKENS={}", val),
        }
    }

    // App
    if let Some(val) = lookup("DEFAULT_MODEL") {
        config.app.default_provider = val;
    }
    if let Some(val) = lookup("AUDIO_ENABLED") {
        config.app.audio_enabled = parse_bool(&val);
    }
    if let Some(val) = lookup("SAVE_HISTORY") {
        config.app.save_history = parse_bool(&val);
    }
    if let Some(val) = lookup("MAX_HISTORY") {
        if let Ok(n) = val.parse::<usize>() {
            config.app.max_history = n;
        }
    }
    if let Some(val) = lookup("LLMCHAT_APP__HISTORY_PATH") {
        config.app.history_path = val;
    }

    // Transcription
    if let Some(val) = lookup("LLMCHAT_TRANSCRIPTION__API_KEY") {
        config.transcription.api_key = val;
    } else if config.transcription.api_key.is_empty() {
        if let Some(val) = lookup("GROQ_API_KEY") {
            config.transcription.api_key = val;
        }
    }

    config
}

fn set_key(settings: &mut ProviderSettings, value: Option<String>) {
    if let Some(key) = value.filter(|k| !k.is_empty()) {
        settings.api_key = key;
    }
}

fn apply_provider_env<F>(settings: &mut ProviderSettings, name: &str, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    set_key(settings, lookup(&format!("LLMCHAT_PROVIDERS__{name}__API_KEY")));
    if let Some(val) = lookup(&format!("LLMCHAT_PROVIDERS__{name}__BASE_URL")) {
        settings.base_url = Some(val);
    }
    if let Some(val) = lookup(&format!("LLMCHAT_PROVIDERS__{name}__MODEL")) {
        settings.model = Some(val);
    }
}

fn parse_bool(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_file() {
        let config = load_config_file(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.app.max_history, 100);
        assert_eq!(config.app.default_provider, "mistral");
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "app": { "defaultProvider": "ollama" },
            "providers": { "ollama": { "model": "llama3" } }
        }"#,
        );

        let config = load_config_file(file.path());
        assert_eq!(config.app.default_provider, "ollama");
        assert_eq!(config.providers.ollama.model.as_deref(), Some("llama3"));
        assert_eq!(config.providers.ollama.parameters.temperature, 0.7);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = load_config_file(file.path());
        assert_eq!(config.app.max_history, 100);
    }

    #[test]
    fn test_read_invalid_json_is_error() {
        let file = write_temp_json(r#"{ "app": { "theme": "dark", } }"#);
        let err = read_config_file(file.path()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_missing_file_is_default() {
        let config = read_config_file(Path::new("/nonexistent/path/config.json")).unwrap();
        assert_eq!(config.app.default_provider, "mistral");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.app.default_provider = "gemini".to_string();
        config.providers.gemini.api_key = "g-test".to_string();

        save_config(&config, Some(&path)).unwrap();

        let reloaded = load_config_file(&path);
        assert_eq!(reloaded.app.default_provider, "gemini");
        assert_eq!(reloaded.providers.gemini.api_key, "g-test");
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_config(&Config::default(), Some(&path)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["app"].get("maxHistory").is_some());
        assert!(raw["app"].get("max_history").is_none());
    }

    #[test]
    fn test_short_env_names() {
        let config = apply_overrides(
            Config::default(),
            env(&[
                ("GEMINI_API_KEY", "g-env"),
                ("OLLAMA_URL", "http://gpu-box:11434"),
                ("DEFAULT_MODEL", "gemini"),
                ("SAVE_HISTORY", "false"),
                ("MAX_HISTORY", "5"),
            ]),
        );
        assert_eq!(config.providers.gemini.api_key, "g-env");
        assert_eq!(
            config.providers.ollama.base_url.as_deref(),
            Some("http://gpu-box:11434")
        );
        assert_eq!(config.app.default_provider, "gemini");
        assert!(!config.app.save_history);
        assert_eq!(config.app.max_history, 5);
    }

    #[test]
    fn test_namespaced_env_wins_over_short_name() {
        let config = apply_overrides(
            Config::default(),
            env(&[
                ("MISTRAL_API_KEY", "short"),
                ("LLMCHAT_PROVIDERS__MISTRAL__API_KEY", "namespaced"),
                ("LLMCHAT_PROVIDERS__LM_STUDIO__MODEL", "qwen2.5-7b"),
            ]),
        );
        assert_eq!(config.providers.mistral.api_key, "namespaced");
        assert_eq!(config.providers.lm_studio.model.as_deref(), Some("qwen2.5-7b"));
    }

    #[test]
    fn test_default_generation_params_apply_to_all() {
        let config = apply_overrides(
            Config::default(),
            env(&[("DEFAULT_TEMPERATURE", "0.3"), ("DEFAULT_MAX_TOKENS", "1000")]),
        );
        for (_, settings) in config.providers.iter() {
            assert_eq!(settings.parameters.temperature, 0.3);
            assert_eq!(settings.parameters.max_tokens, Some(1000));
        }
    }

    #[test]
    fn test_invalid_numeric_env_ignored() {
        let config = apply_overrides(
            Config::default(),
            env(&[("DEFAULT_TEMPERATURE", "warm"), ("DEFAULT_MAX_TOKENS", "0")]),
        );
        assert_eq!(config.providers.mistral.parameters.temperature, 0.7);
        assert!(config.providers.mistral.parameters.max_tokens.is_none());
    }

    #[test]
    fn test_groq_key_only_fills_empty_transcription_key() {
        let config = apply_overrides(Config::default(), env(&[("GROQ_API_KEY", "gsk-1")]));
        assert_eq!(config.transcription.api_key, "gsk-1");

        let mut preset = Config::default();
        preset.transcription.api_key = "from-file".to_string();
        let config = apply_overrides(preset, env(&[("GROQ_API_KEY", "gsk-1")]));
        assert_eq!(config.transcription.api_key, "from-file");
    }

    #[test]
    fn test_update_model_parameters() {
        let mut config = Config::default();
        assert!(update_model_parameters(&mut config, "gemini", Some(0.1), Some(64)));
        assert_eq!(config.providers.gemini.parameters.temperature, 0.1);
        assert_eq!(config.providers.gemini.parameters.max_tokens, Some(64));

        assert!(update_model_parameters(&mut config, "gemini", None, None));
        assert_eq!(config.providers.gemini.parameters.temperature, 0.1);

        assert!(!update_model_parameters(&mut config, "openai", Some(1.0), None));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }
}
