//! Model fallback with bounded retry
//!
//! Walks the registry's candidates in priority order. Transient failures are
//! retried on the same candidate with exponential backoff before moving on.
//! Every failure is folded into a sentinel-prefixed string, so callers only
//! ever see text.

use super::{LlmError, LlmMessage, LlmRequest, LlmResponse, LlmService, ModelRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Prefix marking a reply that carries a diagnostic instead of model output
pub const ERROR_SENTINEL: &str = "\u{26a0}concierge-error: ";

/// Returned when a model answers successfully with no text
pub const EMPTY_RESPONSE_TEXT: &str =
    "Sorry, the response came back empty. Could you say that again?";

pub fn is_error_sentinel(text: &str) -> bool {
    text.starts_with(ERROR_SENTINEL)
}

fn sentinel(diagnostic: impl AsRef<str>) -> String {
    format!("{ERROR_SENTINEL}{}", diagnostic.as_ref())
}

/// Per-candidate retry bounds
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts
    #[allow(dead_code)] // Used in tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before the attempt following `attempt` (1-based): 1s, 2s, 4s...
    /// A longer provider hint wins, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1 << exponent);
        backoff.max(hint.unwrap_or_default()).min(self.max_delay)
    }
}

/// Conversational client over an ordered set of candidate models
pub struct FallbackChat {
    registry: ModelRegistry,
    system_prompt: String,
    temperature: Option<f32>,
    policy: RetryPolicy,
    current: AtomicUsize,
}

impl FallbackChat {
    pub fn new(registry: ModelRegistry, system_prompt: impl Into<String>) -> Self {
        Self {
            registry,
            system_prompt: system_prompt.into(),
            temperature: Some(0.3),
            policy: RetryPolicy::default(),
            current: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Index of the candidate the next send starts from
    pub fn candidate_index(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Back to the first candidate
    pub fn reset(&self) {
        let previous = self.current.swap(0, Ordering::SeqCst);
        tracing::info!(previous_candidate = previous, "Language service reset");
    }

    /// Send `message` after `history`. Never fails: errors come back as
    /// `ERROR_SENTINEL`-prefixed text.
    pub async fn send(&self, history: &[LlmMessage], message: &str) -> String {
        if !self.registry.has_models() {
            tracing::error!("No language model available: API key not configured");
            return sentinel("API key not configured");
        }

        let mut messages = history.to_vec();
        messages.push(LlmMessage::user(message));
        let request = LlmRequest {
            system: Some(self.system_prompt.clone()),
            messages,
            temperature: self.temperature,
            max_tokens: None,
        };

        let start = self.candidate_index().min(self.registry.len() - 1);
        let mut last_error: Option<LlmError> = None;

        for (index, service) in self.registry.candidates().iter().enumerate().skip(start) {
            self.current.store(index, Ordering::SeqCst);

            match self.complete_with_retry(service, &request).await {
                Ok(response) if response.text.trim().is_empty() => {
                    tracing::warn!(model = %service.model_id(), "Model returned empty text");
                    return EMPTY_RESPONSE_TEXT.to_string();
                }
                Ok(response) => return response.text,
                Err(e) if !e.kind.allows_fallback() => {
                    tracing::error!(model = %service.model_id(), error = %e, "Non-recoverable language service error");
                    return sentinel(e.message);
                }
                Err(e) => {
                    tracing::warn!(
                        model = %service.model_id(),
                        error = %e,
                        kind = ?e.kind,
                        "Candidate model failed, falling back"
                    );
                    last_error = Some(e);
                }
            }
        }

        let detail = last_error.map_or_else(|| "no response".to_string(), |e| e.message);
        tracing::error!(error = %detail, "All candidate models exhausted");
        sentinel(format!("all candidate models failed; last error: {detail}"))
    }

    async fn complete_with_retry(
        &self,
        service: &Arc<dyn LlmService>,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let mut attempt = 1;
        loop {
            match service.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.kind.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt, e.retry_after);
                    tracing::warn!(
                        model = %service.model_id(),
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Retrying language service request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
