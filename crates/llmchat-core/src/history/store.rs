//! Conversation persistence and caching.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::Message;
use crate::utils;

// ─────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────

/// A conversation with its message history.
#[derive(Clone, Debug, PartialEq)]
pub struct Conversation {
    pub id: String,
    /// Provider the conversation was last held with, if known.
    pub provider: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Conversation {
            id: id.into(),
            provider: None,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Drop the oldest messages so at most `max` remain.
    fn truncate_to(&mut self, max: usize) {
        let len = self.messages.len();
        if len > max {
            self.messages.drain(..len - max);
        }
    }
}

/// Metadata header written as the first line of each JSONL file.
#[derive(Debug, Serialize, Deserialize)]
struct ConversationMetadata {
    #[serde(rename = "_type")]
    record_type: String,
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Summary of a saved conversation for listing purposes.
#[derive(Clone, Debug)]
pub struct ConversationSummary {
    pub id: String,
    pub provider: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub path: PathBuf,
}

// ─────────────────────────────────────────────
// HistoryStore
// ─────────────────────────────────────────────

/// Manages conversations with in-memory caching and JSONL persistence.
///
/// Thread-safe via `RwLock`. Saved conversations keep at most `max_messages`
/// of their most recent messages.
pub struct HistoryStore {
    dir: PathBuf,
    max_messages: usize,
    cache: RwLock<HashMap<String, Conversation>>,
}

impl HistoryStore {
    /// Open (and create) the history directory.
    pub fn new(dir: impl Into<PathBuf>, max_messages: usize) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(HistoryStore {
            dir,
            max_messages,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Directory holding the conversation files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get an existing conversation or create a new one.
    ///
    /// 1. Check in-memory cache
    /// 2. Try to load from disk
    /// 3. Create new empty conversation
    pub fn get_or_create(&self, id: &str) -> Conversation {
        if let Some(conversation) = self.read_cache().get(id) {
            return conversation.clone();
        }

        let conversation = self
            .load_from_disk(id)
            .unwrap_or_else(|| Conversation::new(id));
        self.write_cache()
            .insert(id.to_string(), conversation.clone());
        conversation
    }

    /// Append one message and persist.
    pub fn append(&self, id: &str, message: Message) -> std::io::Result<()> {
        let mut conversation = self.get_or_create(id);
        conversation.messages.push(message);
        self.save(conversation)
    }

    /// Replace a conversation wholesale and persist it.
    pub fn save(&self, mut conversation: Conversation) -> std::io::Result<()> {
        conversation.truncate_to(self.max_messages);
        conversation.updated_at = Utc::now();
        self.write_cache()
            .insert(conversation.id.clone(), conversation.clone());
        self.save_to_disk(&conversation)
    }

    /// Clear all messages in a conversation (reset).
    pub fn clear(&self, id: &str) -> std::io::Result<()> {
        let mut conversation = self.get_or_create(id);
        conversation.messages.clear();
        self.save(conversation)
    }

    /// Delete a conversation entirely (from cache and disk).
    ///
    /// Returns `true` if the file existed on disk.
    pub fn delete(&self, id: &str) -> bool {
        self.write_cache().remove(id);

        let path = self.conversation_path(id);
        if !path.exists() {
            return false;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted conversation file: {}", path.display());
                true
            }
            Err(e) => {
                warn!("Failed to delete conversation file: {}", e);
                false
            }
        }
    }

    /// List saved conversations, newest first.
    pub fn list(&self) -> Vec<ConversationSummary> {
        let mut summaries = Vec::new();

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read history directory: {}", e);
                return summaries;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "jsonl") {
                continue;
            }

            let Ok(file) = std::fs::File::open(&path) else {
                continue;
            };
            let first = std::io::BufReader::new(file).lines().next();
            if let Some(Ok(line)) = first {
                if let Ok(meta) = serde_json::from_str::<ConversationMetadata>(&line) {
                    summaries.push(ConversationSummary {
                        id: meta.id,
                        provider: meta.provider,
                        updated_at: meta.updated_at,
                        path: path.clone(),
                    });
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<String, Conversation>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<String, Conversation>> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }

    fn conversation_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", utils::safe_filename(id)))
    }

    fn load_from_disk(&self, id: &str) -> Option<Conversation> {
        let path = self.conversation_path(id);
        if !path.exists() {
            return None;
        }

        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to open conversation file {}: {}", path.display(), e);
                return None;
            }
        };

        let mut conversation = Conversation::new(id);
        for line in std::io::BufReader::new(file).lines().map_while(Result::ok) {
            if line.trim().is_empty() {
                continue;
            }

            if let Ok(meta) = serde_json::from_str::<ConversationMetadata>(&line) {
                if meta.record_type == "metadata" {
                    conversation.provider = meta.provider;
                    conversation.created_at = meta.created_at;
                    conversation.updated_at = meta.updated_at;
                    continue;
                }
            }

            match serde_json::from_str::<Message>(&line) {
                Ok(msg) => conversation.messages.push(msg),
                Err(e) => warn!("Skipping unreadable history line in {}: {}", path.display(), e),
            }
        }

        debug!(
            "Loaded conversation '{}' with {} messages from disk",
            id,
            conversation.messages.len()
        );
        Some(conversation)
    }

    fn save_to_disk(&self, conversation: &Conversation) -> std::io::Result<()> {
        let path = self.conversation_path(&conversation.id);
        let mut file = std::fs::File::create(&path)?;

        let meta = ConversationMetadata {
            record_type: "metadata".to_string(),
            id: conversation.id.clone(),
            provider: conversation.provider.clone(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        };
        writeln!(file, "{}", serde_json::to_string(&meta)?)?;

        for msg in &conversation.messages {
            writeln!(file, "{}", serde_json::to_string(msg)?)?;
        }

        debug!(
            "Saved conversation '{}' ({} messages) to {}",
            conversation.id,
            conversation.messages.len(),
            path.display()
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
