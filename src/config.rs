//! Process configuration from environment variables

use crate::handoff::Consultant;
use crate::llm::LlmConfig;
use std::path::PathBuf;

pub const DEFAULT_CONSULTANT_NAME: &str = "Bruno Hamawaki";
pub const DEFAULT_CONSULTANT_PHONE: &str = "817091225330";

#[derive(Debug, Clone)]
pub struct ConciergeConfig {
    pub llm: LlmConfig,
    pub db_path: PathBuf,
    pub consultant: Consultant,
}

impl ConciergeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(LlmConfig::from_env(), |key| std::env::var(key).ok())
    }

    fn from_lookup(llm: LlmConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = non_empty("CONCIERGE_DB_PATH").map_or_else(
            || {
                let home = non_empty("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".concierge").join("concierge.db")
            },
            PathBuf::from,
        );

        Self {
            llm,
            db_path,
            consultant: Consultant {
                name: non_empty("CONSULTANT_NAME")
                    .unwrap_or_else(|| DEFAULT_CONSULTANT_NAME.to_string()),
                phone: non_empty("CONSULTANT_PHONE")
                    .unwrap_or_else(|| DEFAULT_CONSULTANT_PHONE.to_string()),
            },
        }
    }
}
