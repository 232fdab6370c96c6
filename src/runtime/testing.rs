//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmResponse, LlmService, Usage, ERROR_SENTINEL};
use crate::state_machine::Conversation;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock Language Service
// ============================================================================

/// One recorded `send`
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub history: Vec<LlmMessage>,
    pub message: String,
}

/// Language service that answers with queued replies
#[derive(Default)]
pub struct MockLanguageService {
    replies: Mutex<VecDeque<String>>,
    /// Record of every send
    pub sent: Mutex<Vec<SentMessage>>,
    candidate: AtomicUsize,
    resets: AtomicUsize,
}

#[allow(dead_code)]
impl MockLanguageService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next sends with `replies`, in order
    pub fn with_replies<I, T>(replies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.queue_reply(reply);
        }
        mock
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.replies.lock().unwrap().push_back(reply.into());
    }

    pub fn set_candidate(&self, index: usize) {
        self.candidate.store(index, Ordering::SeqCst);
    }

    pub fn recorded_sends(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn reset_count(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageService for MockLanguageService {
    async fn send(&self, history: &[LlmMessage], message: &str) -> String {
        self.sent.lock().unwrap().push(SentMessage {
            history: history.to_vec(),
            message: message.to_string(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("{ERROR_SENTINEL}no mock reply queued"))
    }

    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.candidate.store(0, Ordering::SeqCst);
    }

    fn candidate_index(&self) -> usize {
        self.candidate.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Gated Mock Language Service (for in-flight testing)
// ============================================================================

/// Language service that holds every reply until the test releases it
pub struct GatedLanguageService {
    inner: MockLanguageService,
    gate: Notify,
    /// Notified when a send starts (for test synchronization)
    pub send_started: Arc<Notify>,
}

#[allow(dead_code)]
impl GatedLanguageService {
    pub fn new(inner: MockLanguageService) -> Self {
        Self {
            inner,
            gate: Notify::new(),
            send_started: Arc::new(Notify::new()),
        }
    }

    /// Let one pending (or the next) send complete
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn inner(&self) -> &MockLanguageService {
        &self.inner
    }
}

#[async_trait]
impl LanguageService for GatedLanguageService {
    async fn send(&self, history: &[LlmMessage], message: &str) -> String {
        self.send_started.notify_one();
        self.gate.notified().await;
        self.inner.send(history, message).await
    }

    fn reset(&self) {
        self.inner.reset();
    }

    fn candidate_index(&self) -> usize {
        self.inner.candidate_index()
    }
}

// ============================================================================
// Mock LLM Service (provider level)
// ============================================================================

/// Provider that returns queued results, for driving a real `FallbackChat`
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_text(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")));
        next.map(|text| LlmResponse {
            text,
            finish_reason: Some("STOP".to_string()),
            usage: Usage::default(),
        })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Conversation store kept in memory, counting writes
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Conversation>>,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `conversation`
    pub fn with_conversation(conversation: Conversation) -> Self {
        Self {
            slot: Mutex::new(Some(conversation)),
            ..Self::default()
        }
    }

    pub fn stored(&self) -> Option<Conversation> {
        self.slot.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl ConversationStore for MemoryStore {
    fn save(&self, conversation: &Conversation) {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap() = Some(conversation.clone());
    }

    fn load(&self) -> Option<Conversation> {
        self.stored()
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.slot.lock().unwrap() = None;
    }
}
