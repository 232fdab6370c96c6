//! Dialogue runtime executor

use super::traits::{ConversationStore, LanguageService};
use super::{DialogueView, Envelope};

use crate::db::{Role, Turn};
use crate::llm::{is_error_sentinel, LlmMessage};
use crate::state_machine::{
    transition, Conversation, DialogueContext, DialogueState, Effect, Event, TransitionError,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Owns the dialogue state and executes transition effects. Generic over the
/// store and the language service so tests can swap both.
pub struct DialogueRuntime<S, L>
where
    S: ConversationStore + 'static,
    L: LanguageService + 'static,
{
    context: DialogueContext,
    state: DialogueState,
    conversation: Conversation,
    store: S,
    service: Arc<L>,
    command_rx: mpsc::Receiver<Envelope>,
    /// Replies from the language service come back through here
    reply_rx: mpsc::Receiver<Event>,
    reply_tx: mpsc::Sender<Event>,
    view_tx: watch::Sender<DialogueView>,
}

impl<S, L> DialogueRuntime<S, L>
where
    S: ConversationStore + 'static,
    L: LanguageService + 'static,
{
    pub fn new(
        context: DialogueContext,
        store: S,
        service: L,
        command_rx: mpsc::Receiver<Envelope>,
        view_tx: watch::Sender<DialogueView>,
    ) -> Self {
        let (reply_tx, reply_rx) = mpsc::channel(8);
        Self {
            context,
            state: DialogueState::Init,
            conversation: Conversation::default(),
            store,
            service: Arc::new(service),
            command_rx,
            reply_rx,
            reply_tx,
            view_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Starting dialogue runtime");

        let startup = match self.store.load() {
            Some(conversation) => {
                tracing::info!(
                    turns = conversation.turns.len(),
                    finalized = conversation.finalized,
                    errored = conversation.errored,
                    "Restoring saved conversation"
                );
                let event = Event::Restored {
                    finalized: conversation.finalized,
                    errored: conversation.errored,
                };
                self.conversation = conversation;
                event
            }
            None => Event::FreshStart,
        };

        if let Err(e) = self.process_event(startup) {
            tracing::error!(error = %e, "Failed to start dialogue");
        }

        // Stops once every handle is gone; a pending reply is dropped with it.
        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(envelope) => {
                        let outcome = self.process_event(envelope.event);
                        if let Some(ack) = envelope.ack {
                            let _ = ack.send(outcome);
                        }
                    }
                    None => break,
                },
                Some(event) = self.reply_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        tracing::error!(error = %e, "Language service reply was not accepted");
                    }
                }
            }
        }

        tracing::info!("Dialogue runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<DialogueState, TransitionError> {
        let result = match transition(self.state, &self.conversation, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(state = self.state.as_str(), error = %e, "Event rejected");
                return Err(e);
            }
        };

        if result.new_state != self.state {
            tracing::debug!(
                from = self.state.as_str(),
                to = result.new_state.as_str(),
                "Dialogue state change"
            );
        }
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.publish();
        Ok(self.state)
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::PersistSnapshot => self.store.save(&self.conversation),
            Effect::ClearSnapshot => self.store.clear(),
            Effect::ResetLanguageService => self.service.reset(),
            Effect::RequestReply {
                history_len,
                message,
            } => self.request_reply(history_len, message),
            data => self.conversation.apply(&data),
        }
    }

    /// Spawn the language service call; its reply re-enters as an event.
    fn request_reply(&self, history_len: usize, message: String) {
        let end = history_len.min(self.conversation.turns.len());
        let history = build_history(
            &self.conversation.turns[..end],
            &self.context.bootstrap_prompt,
        );
        let service = Arc::clone(&self.service);
        let reply_tx = self.reply_tx.clone();

        tokio::spawn(async move {
            let text = service.send(&history, &message).await;
            let candidate_index = service.candidate_index();

            if is_error_sentinel(&text) {
                tracing::error!(diagnostic = %text, candidate_index, "Language service unavailable");
            }

            let _ = reply_tx
                .send(Event::ModelReply {
                    text,
                    candidate_index,
                })
                .await;
        });
    }

    fn publish(&self) {
        self.view_tx
            .send_replace(DialogueView::capture(self.state, &self.conversation));
    }
}

/// Provider-side history for the stored turns. A history that opens with
/// the model's greeting gets the bootstrap prompt in front of it.
pub(crate) fn build_history(turns: &[Turn], bootstrap_prompt: &str) -> Vec<LlmMessage> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    if turns.first().is_some_and(|t| t.role == Role::Model) {
        messages.push(LlmMessage::user(bootstrap_prompt));
    }
    messages.extend(turns.iter().map(|turn| match turn.role {
        Role::User => LlmMessage::user(turn.text.as_str()),
        Role::Model => LlmMessage::assistant(turn.text.as_str()),
    }));
    messages
}
