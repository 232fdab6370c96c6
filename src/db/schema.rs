//! Database schema and persisted types

pub use crate::state_machine::state::Conversation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    saved_at TEXT NOT NULL
);
";

/// Slot holding the conversation snapshot. Bump the suffix whenever the
/// snapshot layout changes incompatibly; older slots are then ignored.
pub const CONVERSATION_KEY: &str = "concierge.conversation.v1";

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
        }
    }
}

/// One message of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    #[allow(dead_code)] // Used in tests
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Persisted form of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub turns: Vec<Turn>,
    pub finalized: bool,
    #[serde(default)]
    pub errored: bool,
    #[serde(default)]
    pub model_fallback_index: usize,
    /// Milliseconds since the Unix epoch
    pub saved_at: i64,
}

impl ConversationSnapshot {
    pub fn capture(conversation: &Conversation) -> Self {
        Self {
            turns: conversation.turns.clone(),
            finalized: conversation.finalized,
            errored: conversation.errored,
            model_fallback_index: conversation.model_fallback_index,
            saved_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn into_conversation(self) -> Conversation {
        Conversation {
            turns: self.turns,
            finalized: self.finalized,
            errored: self.errored,
            model_fallback_index: self.model_fallback_index,
        }
    }
}
