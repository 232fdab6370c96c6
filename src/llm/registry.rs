//! Ordered registry of candidate models

use super::gemini::GeminiService;
use super::{LlmService, LoggingService};
use std::sync::Arc;

/// Models tried in priority order when none are configured
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-3-flash-preview",
    "gemini-2.5-flash",
    "gemini-2.0-flash",
];

/// Configuration for the language service
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// Candidate model identifiers, highest priority first
    pub models: Vec<String>,
    /// Override for the provider endpoint (proxies, tests)
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());

        let models = std::env::var("CONCIERGE_MODELS")
            .ok()
            .map(|raw| parse_model_list(&raw))
            .filter(|models| !models.is_empty())
            .unwrap_or_else(|| DEFAULT_MODELS.iter().map(ToString::to_string).collect());

        Self {
            api_key,
            models,
            base_url: std::env::var("GEMINI_BASE_URL").ok(),
        }
    }
}

/// Split a comma-separated model list, dropping blanks and repeats
pub fn parse_model_list(raw: &str) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !models.iter().any(|m| m == name) {
            models.push(name.to_string());
        }
    }
    models
}

/// Candidate models, in the order the fallback policy walks them
pub struct ModelRegistry {
    candidates: Vec<Arc<dyn LlmService>>,
}

impl ModelRegistry {
    /// Empty registry; every send degrades to the missing-credential sentinel
    pub fn new_empty() -> Self {
        Self {
            candidates: Vec::new(),
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let Some(api_key) = config.api_key.as_ref().filter(|k| !k.is_empty()) else {
            return Self::new_empty();
        };

        let candidates = config
            .models
            .iter()
            .map(|model| {
                let service: Arc<dyn LlmService> = Arc::new(GeminiService::new(
                    api_key.clone(),
                    model,
                    config.base_url.as_deref(),
                ));
                Arc::new(LoggingService::new(service)) as Arc<dyn LlmService>
            })
            .collect();

        Self { candidates }
    }

    /// Build from already-constructed services (tests, alternative providers)
    pub fn from_services(candidates: Vec<Arc<dyn LlmService>>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[Arc<dyn LlmService>] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn has_models(&self) -> bool {
        !self.candidates.is_empty()
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|c| c.model_id().to_string())
            .collect()
    }
}
