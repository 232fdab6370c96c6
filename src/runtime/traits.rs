//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{ConversationSnapshot, Database, CONVERSATION_KEY};
use crate::llm::{FallbackChat, LlmMessage};
use crate::state_machine::Conversation;
use async_trait::async_trait;
use std::sync::Arc;

/// Storage for the conversation snapshot. Failures are logged, never returned.
pub trait ConversationStore: Send + Sync {
    fn save(&self, conversation: &Conversation);

    /// `None` when nothing usable is stored
    fn load(&self) -> Option<Conversation>;

    fn clear(&self);
}

/// Conversational client that always answers with text
#[async_trait]
pub trait LanguageService: Send + Sync {
    /// Reply to `message` given `history`; failures come back as
    /// sentinel-prefixed text.
    async fn send(&self, history: &[LlmMessage], message: &str) -> String;

    /// Return to the first candidate model
    fn reset(&self);

    /// Candidate model currently in use
    fn candidate_index(&self) -> usize;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    fn save(&self, conversation: &Conversation) {
        (**self).save(conversation);
    }

    fn load(&self) -> Option<Conversation> {
        (**self).load()
    }

    fn clear(&self) {
        (**self).clear();
    }
}

#[async_trait]
impl<T: LanguageService + ?Sized> LanguageService for Arc<T> {
    async fn send(&self, history: &[LlmMessage], message: &str) -> String {
        (**self).send(history, message).await
    }

    fn reset(&self) {
        (**self).reset();
    }

    fn candidate_index(&self) -> usize {
        (**self).candidate_index()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as the conversation store
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
    key: String,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            key: CONVERSATION_KEY.to_string(),
        }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

impl ConversationStore for DatabaseStore {
    fn save(&self, conversation: &Conversation) {
        let snapshot = ConversationSnapshot::capture(conversation);
        let value = match serde_json::to_string(&snapshot) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize conversation snapshot");
                return;
            }
        };

        // One small row, written inline on the runtime task
        if let Err(e) = self.db.put_slot(&self.key, &value) {
            tracing::warn!(error = %e, key = %self.key, "Failed to save conversation snapshot");
        }
    }

    fn load(&self) -> Option<Conversation> {
        let raw = match self.db.get_slot(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key, "Failed to read conversation snapshot");
                return None;
            }
        };

        let snapshot: ConversationSnapshot = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key, "Discarding unreadable conversation snapshot");
                return None;
            }
        };

        if snapshot.turns.is_empty() {
            tracing::debug!("Stored snapshot has no turns, starting fresh");
            return None;
        }

        tracing::debug!(
            turns = snapshot.turns.len(),
            finalized = snapshot.finalized,
            saved_at = snapshot.saved_at,
            "Loaded conversation snapshot"
        );
        Some(snapshot.into_conversation())
    }

    fn clear(&self) {
        if let Err(e) = self.db.delete_slot(&self.key) {
            tracing::warn!(error = %e, key = %self.key, "Failed to clear conversation snapshot");
        }
    }
}

#[async_trait]
impl LanguageService for FallbackChat {
    async fn send(&self, history: &[LlmMessage], message: &str) -> String {
        FallbackChat::send(self, history, message).await
    }

    fn reset(&self) {
        FallbackChat::reset(self);
    }

    fn candidate_index(&self) -> usize {
        FallbackChat::candidate_index(self)
    }
}
