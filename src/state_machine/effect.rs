//! Effects produced by state transitions

use crate::db::Role;

/// Effects to be executed after a transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a turn stamped with the current time
    AppendTurn { role: Role, text: String },

    MarkFinalized,

    MarkErrored,

    /// Remember which candidate model answered
    RecordCandidate { index: usize },

    /// Drop all turns and flags
    ClearConversation,

    /// Write the conversation snapshot
    PersistSnapshot,

    /// Delete the conversation snapshot
    ClearSnapshot,

    /// Return the language service to its first candidate
    ResetLanguageService,

    /// Ask the language service for the next model turn. The first
    /// `history_len` turns are the history; `message` is the new input.
    RequestReply { history_len: usize, message: String },
}

impl Effect {
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendTurn {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn append_model(text: impl Into<String>) -> Self {
        Effect::AppendTurn {
            role: Role::Model,
            text: text.into(),
        }
    }

    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Effect::PersistSnapshot
                | Effect::ClearSnapshot
                | Effect::ResetLanguageService
                | Effect::RequestReply { .. }
        )
    }
}
