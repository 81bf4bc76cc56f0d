//! Core building blocks for llm-chat.
//!
//! - [`types`]: chat messages and roles
//! - [`config`]: typed config schema, JSON loader, env overrides
//! - [`history`]: JSONL conversation persistence
//! - [`audio`]: temp-dir store for audio input

pub mod audio;
pub mod config;
pub mod history;
pub mod types;
pub mod utils;

pub use types::{Message, Role};
