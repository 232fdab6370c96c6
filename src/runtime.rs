//! Runtime for driving the dialogue
//!
//! The executor owns the state machine and runs as one tokio task. Front ends
//! talk to it through a cloneable `DialogueHandle` and watch `DialogueView`
//! snapshots for rendering.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::DialogueRuntime;
pub use traits::*;

use crate::db::Turn;
use crate::handoff::{Consultant, HandoffError, TriageStatus};
use crate::state_machine::{Conversation, DialogueContext, DialogueState, Event, TransitionError};
use reqwest::Url;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// Event plus an optional channel for the outcome
pub struct Envelope {
    pub event: Event,
    pub ack: Option<oneshot::Sender<Result<DialogueState, TransitionError>>>,
}

/// What a front end needs to render the conversation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueView {
    pub state: DialogueState,
    pub turns: Vec<Turn>,
    pub finalized: bool,
    pub errored: bool,
    /// Quick replies for the latest model turn; empty while a reply is pending
    pub options: Vec<String>,
}

impl DialogueView {
    pub fn capture(state: DialogueState, conversation: &Conversation) -> Self {
        Self {
            state,
            turns: conversation.turns.clone(),
            finalized: conversation.finalized,
            errored: conversation.errored,
            options: if state.is_settled() {
                conversation.options()
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogueError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Dialogue runtime has stopped")]
    Closed,
}

/// Handle to interact with a running dialogue
#[derive(Clone)]
pub struct DialogueHandle {
    command_tx: mpsc::Sender<Envelope>,
    view_rx: watch::Receiver<DialogueView>,
    context: Arc<DialogueContext>,
}

impl DialogueHandle {
    /// Submit user text (an option click is the option's label). Returns the
    /// state the dialogue moved to; a rejected submit changes nothing.
    pub async fn submit(&self, text: impl Into<String>) -> Result<DialogueState, DialogueError> {
        self.dispatch(Event::UserSubmit { text: text.into() }).await
    }

    /// Discard the conversation and start over
    pub async fn reset(&self) -> Result<DialogueState, DialogueError> {
        self.dispatch(Event::Reset).await
    }

    async fn dispatch(&self, event: Event) -> Result<DialogueState, DialogueError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.command_tx
            .send(Envelope {
                event,
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| DialogueError::Closed)?;

        Ok(ack_rx.await.map_err(|_| DialogueError::Closed)??)
    }

    /// Latest published view
    pub fn view(&self) -> DialogueView {
        self.view_rx.borrow().clone()
    }

    /// Wait until no reply is pending
    pub async fn settled(&self) -> Result<DialogueView, DialogueError> {
        let mut view_rx = self.view_rx.clone();
        let view = view_rx
            .wait_for(|v| v.state.is_settled())
            .await
            .map_err(|_| DialogueError::Closed)?;
        Ok(view.clone())
    }

    /// Deep link to the consultant, once the dialogue offers one. Error and
    /// welcome-back turns are left out of the summary.
    pub fn handoff_link(&self, consultant: &Consultant) -> Option<Result<Url, HandoffError>> {
        let view = self.view();
        if !view.state.offers_handoff() {
            return None;
        }

        let status = if view.finalized && !view.errored {
            TriageStatus::Completed
        } else {
            TriageStatus::Interrupted
        };
        let turns: Vec<Turn> = view
            .turns
            .into_iter()
            .filter(|turn| !self.context.is_synthetic(turn))
            .collect();
        Some(consultant.link_for(&turns, status))
    }
}

/// Start a dialogue on the current tokio runtime
pub fn spawn<S, L>(context: DialogueContext, store: S, service: L) -> DialogueHandle
where
    S: ConversationStore + 'static,
    L: LanguageService + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (view_tx, view_rx) = watch::channel(DialogueView::default());

    let context = Arc::new(context);
    let runtime = DialogueRuntime::new(
        DialogueContext::clone(&context),
        store,
        service,
        command_rx,
        view_tx,
    );
    tokio::spawn(runtime.run());

    DialogueHandle {
        command_tx,
        view_rx,
        context,
    }
}
