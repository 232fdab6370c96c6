//! Consultant hand-off
//!
//! Turns a finished conversation into a plain-text summary and the messaging
//! deep link that carries it to the consultant.

use crate::db::{Role, Turn};
use crate::markers::strip_markers;
use crate::system_prompt::HANDOFF_PHRASE;
use regex::Regex;
use reqwest::Url;
use std::fmt::Write;
use std::sync::LazyLock;
use thiserror::Error;

const LINK_BASE: &str = "https://wa.me";
const RULE: &str = "------------------------------------";

/// Model texts containing any of these are pleasantries, not questions
const SKIPPED_PHRASES: &[&str] = &["thank you", "nice to meet you"];

static HANDOFF_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("(?i){}", regex::escape(HANDOFF_PHRASE)))
        .expect("hand-off phrase pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandoffError {
    #[error("Consultant phone number has no digits: {0:?}")]
    InvalidPhone(String),
    #[error("Failed to build hand-off link: {0}")]
    InvalidLink(String),
}

/// How the intake ended, for the summary header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageStatus {
    /// The model collected every answer
    Completed,
    /// The language service failed before the intake finished
    Interrupted,
}

impl TriageStatus {
    fn label(self) -> &'static str {
        match self {
            TriageStatus::Completed => "Virtual triage completed",
            TriageStatus::Interrupted => "Virtual triage interrupted by a technical issue",
        }
    }
}

/// Who receives the hand-off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consultant {
    pub name: String,
    /// International format; anything but digits is ignored
    pub phone: String,
}

impl Consultant {
    /// Summary and deep link for `turns`
    pub fn link_for(&self, turns: &[Turn], status: TriageStatus) -> Result<Url, HandoffError> {
        deep_link(&self.phone, &build_summary(turns, &self.name, status))
    }
}

/// Render the collected answers as a chat message.
///
/// The opening greeting is skipped. Each remaining model turn contributes
/// its last line as the question, unless it is a pleasantry or too short to
/// be one; each user turn contributes an answer.
pub fn build_summary(turns: &[Turn], consultant_name: &str, status: TriageStatus) -> String {
    let mut summary = String::new();
    let _ = writeln!(summary, "*CONCIERGE - INTAKE REQUEST*");
    let _ = writeln!(summary, "{RULE}");
    let _ = writeln!(summary, "*Consultant:* {consultant_name}");
    let _ = writeln!(summary, "*Status:* {}", status.label());
    let _ = writeln!(summary);
    let _ = writeln!(summary, "*TRIAGE DETAILS:*");

    for turn in turns.iter().skip(1) {
        match turn.role {
            Role::Model => {
                if let Some(question) = question_line(&turn.text) {
                    let _ = write!(summary, "\n*Q:* {question}\n");
                }
            }
            Role::User => {
                let _ = writeln!(summary, "*A:* {}", turn.text);
            }
        }
    }

    let _ = write!(summary, "\n{RULE}\n_Sent via Concierge_");
    summary
}

/// The question a model turn asked, if it asked one
fn question_line(text: &str) -> Option<String> {
    let before_handoff = HANDOFF_SPLIT_RE.split(text).next().unwrap_or_default();
    let clean = strip_markers(before_handoff);
    let clean = clean.trim();

    let lowered = clean.to_lowercase();
    if clean.chars().count() <= 5 || SKIPPED_PHRASES.iter().any(|p| lowered.contains(p)) {
        return None;
    }

    let last = clean.lines().last().map(str::trim).unwrap_or_default();
    Some(if last.is_empty() { clean } else { last }.to_string())
}

/// `https://wa.me/<digits>?text=<percent-encoded summary>`
pub fn deep_link(phone: &str, summary: &str) -> Result<Url, HandoffError> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(HandoffError::InvalidPhone(phone.to_string()));
    }

    let raw = format!("{LINK_BASE}/{digits}?text={}", urlencoding::encode(summary));
    Url::parse(&raw).map_err(|e| HandoffError::InvalidLink(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Vec<Turn> {
        vec![
            Turn::model("Welcome to the concierge. What is your full name?"),
            Turn::user("Ana Souza"),
            Turn::model(
                "Nice to meet you, Ana. How can I help you today?\n\
                 [Permanent Visa][Common Visa][Consulate]",
            ),
            Turn::user("Consulate"),
            Turn::model("Understood.\nWhich document do you need? [Passport][Certificate]"),
            Turn::user("Passport"),
            Turn::model(
                "Thank you, Ana. Please press the CONNECT WITH CONSULTANT button below.",
            ),
        ]
    }

    #[test]
    fn test_summary_lists_questions_and_answers() {
        let summary = build_summary(&transcript(), "Bruno Hamawaki", TriageStatus::Completed);

        assert!(summary.starts_with("*CONCIERGE - INTAKE REQUEST*\n"));
        assert!(summary.contains("*Consultant:* Bruno Hamawaki\n"));
        assert!(summary.contains("*Status:* Virtual triage completed\n"));
        assert!(summary.contains("*A:* Ana Souza\n"));
        assert!(summary.contains("\n*Q:* Which document do you need?\n*A:* Passport\n"));
        assert!(summary.ends_with("_Sent via Concierge_"));
    }

    #[test]
    fn test_summary_skips_greeting_and_pleasantries() {
        let summary = build_summary(&transcript(), "Bruno", TriageStatus::Completed);

        assert!(!summary.contains("full name"));
        assert!(!summary.contains("Nice to meet you"));
        assert!(!summary.contains("CONNECT WITH CONSULTANT"));
        assert_eq!(summary.matches("*Q:*").count(), 1);
        assert_eq!(summary.matches("*A:*").count(), 3);
    }

    #[test]
    fn test_interrupted_status_in_header() {
        let turns = &transcript()[..4];
        let summary = build_summary(turns, "Bruno", TriageStatus::Interrupted);

        assert!(summary.contains("*Status:* Virtual triage interrupted by a technical issue\n"));
        assert!(!summary.contains("completed"));
        assert!(summary.contains("*A:* Consulate\n"));
    }

    #[test]
    fn test_question_line_rules() {
        assert_eq!(question_line("Ok."), None);
        assert_eq!(
            question_line("Which city?\nPlease pick one: [Tokyo][Osaka]").as_deref(),
            Some("Please pick one:")
        );
        assert_eq!(
            question_line("Your passport number? please press connect with consultant").as_deref(),
            Some("Your passport number? please press")
        );
    }

    #[test]
    fn test_deep_link_encodes_summary() {
        let url = deep_link("+81 709-1225-330", "*Q:* Name?\n*A:* Ana & Co").unwrap();

        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/817091225330");
        assert!(url
            .as_str()
            .ends_with("?text=%2AQ%3A%2A%20Name%3F%0A%2AA%3A%2A%20Ana%20%26%20Co"));

        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "text");
        assert_eq!(value, "*Q:* Name?\n*A:* Ana & Co");
    }

    #[test]
    fn test_deep_link_rejects_phone_without_digits() {
        assert_eq!(
            deep_link("n/a", "hi"),
            Err(HandoffError::InvalidPhone("n/a".to_string()))
        );
    }

    #[test]
    fn test_consultant_link_for_transcript() {
        let consultant = Consultant {
            name: "Bruno".to_string(),
            phone: "817091225330".to_string(),
        };
        let url = consultant
            .link_for(&transcript(), TriageStatus::Completed)
            .unwrap();
        let (_, text) = url.query_pairs().next().unwrap();
        assert!(text.contains("*A:* Passport"));
    }
}
