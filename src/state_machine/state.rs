//! Dialogue state types

use super::Effect;
use crate::db::Turn;
use crate::llm::is_error_sentinel;
use crate::markers::extract_options;
use crate::system_prompt::{BOOTSTRAP_PROMPT, HANDOFF_PHRASE, RESTART_LABEL};
use serde::{Deserialize, Serialize};

/// Position of the dialogue controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// Nothing loaded yet
    #[default]
    Init,
    /// Exchange in flight; input disabled
    Loading,
    /// Waiting for the user
    Idle,
    /// Intake complete, hand-off offered; only restart is accepted
    Finalized,
    /// Language service unavailable; only restart and hand-off remain
    Errored,
}

impl DialogueState {
    pub fn as_str(self) -> &'static str {
        match self {
            DialogueState::Init => "init",
            DialogueState::Loading => "loading",
            DialogueState::Idle => "idle",
            DialogueState::Finalized => "finalized",
            DialogueState::Errored => "errored",
        }
    }

    /// No exchange pending and none starting
    pub fn is_settled(self) -> bool {
        matches!(
            self,
            DialogueState::Idle | DialogueState::Finalized | DialogueState::Errored
        )
    }

    pub fn offers_handoff(self) -> bool {
        matches!(self, DialogueState::Finalized | DialogueState::Errored)
    }
}

/// Conversation data owned by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    pub turns: Vec<Turn>,
    pub finalized: bool,
    pub errored: bool,
    /// Candidate model the language service was on after the last exchange
    pub model_fallback_index: usize,
}

impl Conversation {
    /// Quick replies offered by the latest model turn
    pub fn options(&self) -> Vec<String> {
        match self.turns.last() {
            Some(turn) if !turn.is_user() => extract_options(&turn.text),
            _ => Vec::new(),
        }
    }

    /// Apply the data-only effects; I/O effects are left to the runtime.
    pub fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::AppendTurn { role, text } => self.turns.push(Turn::new(*role, text.clone())),
            Effect::MarkFinalized => self.finalized = true,
            Effect::MarkErrored => self.errored = true,
            Effect::RecordCandidate { index } => self.model_fallback_index = *index,
            Effect::ClearConversation => *self = Conversation::default(),
            Effect::PersistSnapshot
            | Effect::ClearSnapshot
            | Effect::ResetLanguageService
            | Effect::RequestReply { .. } => {}
        }
    }
}

/// Fixed wording and phrases that steer the dialogue (immutable configuration)
#[derive(Debug, Clone)]
pub struct DialogueContext {
    pub bootstrap_prompt: String,
    /// Any of these in a model reply finalizes the conversation
    pub handoff_phrases: Vec<String>,
    pub restart_label: String,
    /// Shown instead of a sentinel reply
    pub error_message: String,
    /// Appended when a finalized conversation is restored
    pub welcome_back_message: String,
}

impl Default for DialogueContext {
    fn default() -> Self {
        Self {
            bootstrap_prompt: BOOTSTRAP_PROMPT.to_string(),
            handoff_phrases: vec![HANDOFF_PHRASE.to_string()],
            restart_label: RESTART_LABEL.to_string(),
            error_message: format!(
                "We are experiencing momentary technical difficulties. \
                 Please use the button below to reach the consultant directly, \
                 or try again shortly. [{RESTART_LABEL}]"
            ),
            welcome_back_message: format!(
                "Welcome back! Your triage was already completed and is ready to send to the consultant. \
                 Would you like to start over? [{RESTART_LABEL}]"
            ),
        }
    }
}

impl DialogueContext {
    pub fn is_restart(&self, text: &str) -> bool {
        text.trim().eq_ignore_ascii_case(&self.restart_label)
    }

    pub fn is_handoff(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.handoff_phrases
            .iter()
            .any(|phrase| lowered.contains(&phrase.to_lowercase()))
    }

    pub fn is_error(&self, text: &str) -> bool {
        is_error_sentinel(text)
    }

    /// Model turns the controller wrote itself rather than the language service
    pub fn is_synthetic(&self, turn: &Turn) -> bool {
        !turn.is_user() && (turn.text == self.error_message || turn.text == self.welcome_back_message)
    }
}
