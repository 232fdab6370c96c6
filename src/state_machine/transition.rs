//! Pure state transition function
//!
//! Given the same state, conversation and event, always produces the same
//! new state and effects. Turn timestamps, persistence and network calls are
//! the runtime's business.

use super::{Conversation, DialogueContext, DialogueState, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: DialogueState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: DialogueState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Why an event was ignored. State and conversation are untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A reply is still pending")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Conversation is closed; only restart is available")]
    InputDisabled,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: DialogueState,
    conversation: &Conversation,
    context: &DialogueContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Startup
        // ============================================================
        (DialogueState::Init, Event::FreshStart) => {
            Ok(TransitionResult::new(DialogueState::Loading).with_effect(Effect::RequestReply {
                history_len: conversation.turns.len(),
                message: context.bootstrap_prompt.clone(),
            }))
        }

        // The welcome-back turn is not persisted, so reloading a finalized
        // conversation repeatedly does not pile them up.
        (DialogueState::Init, Event::Restored { finalized: true, .. }) => {
            Ok(TransitionResult::new(DialogueState::Finalized)
                .with_effect(Effect::append_model(context.welcome_back_message.clone())))
        }

        (DialogueState::Init, Event::Restored { errored: true, .. }) => {
            Ok(TransitionResult::new(DialogueState::Errored))
        }

        // The user turn is persisted before its reply, so a snapshot can end on
        // an unanswered turn. Ask for that reply again rather than sending two
        // user messages in a row on the next submit.
        (DialogueState::Init, Event::Restored { .. }) => Ok(match conversation.turns.last() {
            Some(turn) if turn.is_user() => {
                TransitionResult::new(DialogueState::Loading).with_effect(Effect::RequestReply {
                    history_len: conversation.turns.len() - 1,
                    message: turn.text.clone(),
                })
            }
            _ => TransitionResult::new(DialogueState::Idle),
        }),

        // ============================================================
        // User input
        // ============================================================
        (
            DialogueState::Idle | DialogueState::Finalized | DialogueState::Errored,
            Event::UserSubmit { text },
        ) if context.is_restart(&text) => Ok(restart(context)),

        (DialogueState::Idle, Event::UserSubmit { text }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        (DialogueState::Idle, Event::UserSubmit { text }) => {
            Ok(TransitionResult::new(DialogueState::Loading)
                .with_effect(Effect::append_user(text.clone()))
                .with_effect(Effect::PersistSnapshot)
                .with_effect(Effect::RequestReply {
                    history_len: conversation.turns.len(),
                    message: text,
                }))
        }

        (DialogueState::Init | DialogueState::Loading, Event::UserSubmit { .. } | Event::Reset) => {
            Err(TransitionError::Busy)
        }

        (DialogueState::Finalized | DialogueState::Errored, Event::UserSubmit { .. }) => {
            Err(TransitionError::InputDisabled)
        }

        (
            DialogueState::Idle | DialogueState::Finalized | DialogueState::Errored,
            Event::Reset,
        ) => Ok(restart(context)),

        // ============================================================
        // Language service replies
        // ============================================================
        (DialogueState::Loading, Event::ModelReply { text, candidate_index }) => {
            let record = Effect::RecordCandidate {
                index: candidate_index,
            };

            if context.is_error(&text) {
                return Ok(TransitionResult::new(DialogueState::Errored).with_effects([
                    record,
                    Effect::append_model(context.error_message.clone()),
                    Effect::MarkErrored,
                    Effect::PersistSnapshot,
                ]));
            }

            if context.is_handoff(&text) {
                return Ok(TransitionResult::new(DialogueState::Finalized).with_effects([
                    record,
                    Effect::append_model(text),
                    Effect::MarkFinalized,
                    Effect::PersistSnapshot,
                ]));
            }

            Ok(TransitionResult::new(DialogueState::Idle).with_effects([
                record,
                Effect::append_model(text),
                Effect::PersistSnapshot,
            ]))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}

/// Discard everything and ask for a fresh greeting
fn restart(context: &DialogueContext) -> TransitionResult {
    TransitionResult::new(DialogueState::Loading).with_effects([
        Effect::ClearSnapshot,
        Effect::ClearConversation,
        Effect::ResetLanguageService,
        Effect::RequestReply {
            history_len: 0,
            message: context.bootstrap_prompt.clone(),
        },
    ])
}
