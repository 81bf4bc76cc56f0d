//! Conversation history: in-memory cache + JSONL file persistence.
//!
//! # Disk format (JSONL)
//!
//! Each conversation is a `.jsonl` file under the configured history directory.
//! - Line 1: metadata `{"_type": "metadata", "id": "...", "provider": "...",
//!   "created_at": "...", "updated_at": "..."}`
//! - Lines 2+: messages `{"role": "user", "content": "hello", "timestamp": "..."}`

pub mod store;

pub use store::{Conversation, ConversationSummary, HistoryStore};
