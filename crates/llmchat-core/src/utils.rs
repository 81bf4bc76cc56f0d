//! Path resolution and small string helpers.

use std::path::PathBuf;

/// Application data directory (`~/.llm-chat/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".llm-chat")
}

/// Default config file path (`~/.llm-chat/config.json`).
pub fn get_config_path() -> PathBuf {
    get_data_path().join("config.json")
}

/// Scratch directory for recorded audio clips (`$TMP/llm-chat-audio/`).
pub fn get_audio_temp_path() -> PathBuf {
    std::env::temp_dir().join("llm-chat-audio")
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Sanitize a string for use as a filename.
pub fn safe_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    dirs_next::home_dir()
}
