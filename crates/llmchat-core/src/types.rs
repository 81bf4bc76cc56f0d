//! Chat message types shared by the UI, the history store and every provider.
//!
//! A [`Message`] is an immutable value: the UI creates one per turn, a provider reads a
//! slice of them for one request. Providers never mutate or persist messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Role
// ─────────────────────────────────────────────

/// Who authored a message.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Wire name used by OpenAI-compatible APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

// ─────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────

/// One turn of a conversation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// When the turn was created. Conversations are ordered oldest first.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a message with an explicit timestamp.
    pub fn at(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Message {
            role,
            content: content.into(),
            timestamp,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Whether `messages` is in chronological order (timestamps never decrease).
pub fn is_chronological(messages: &[Message]) -> bool {
    messages
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
