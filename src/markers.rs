//! Quick-reply marker codec
//!
//! Model replies offer fixed choices as bracketed labels, `Welcome. [Visa][Consulate]`.
//! `extract_options` turns those into button labels and `strip_markers`
//! produces the text shown to the user. When a reply carries no markers a
//! couple of keyword heuristics still try to offer something; they are best
//! effort and may miss or misfire.

use crate::system_prompt::category_labels;
use regex::Regex;
use std::sync::LazyLock;

/// `[label]` with no nested brackets and no line break inside
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]\r\n]*)\]").expect("marker pattern is valid"));

static DELIMITER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\]]").expect("delimiter pattern is valid"));

/// Phrases the model uses when presenting the service menu
const MENU_PHRASES: &[&str] = &[
    "how can i help",
    "how may i help",
    "how can i assist",
    "choose one of the options",
    "options below",
];

/// Option labels in order of appearance, duplicates kept.
pub fn extract_options(text: &str) -> Vec<String> {
    let labels: Vec<String> = MARKER_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|label| !label.is_empty())
        .map(ToString::to_string)
        .collect();

    if labels.is_empty() {
        heuristic_options(text)
    } else {
        labels
    }
}

/// Text with every marker span and stray delimiter removed, trimmed.
pub fn strip_markers(text: &str) -> String {
    let without_spans = MARKER_RE.replace_all(text, "");
    DELIMITER_RE
        .replace_all(&without_spans, "")
        .trim()
        .to_string()
}

fn heuristic_options(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();

    let mut has_yes = false;
    let mut has_no = false;
    for word in lowered.split(|c: char| !c.is_alphanumeric()) {
        match word {
            "yes" => has_yes = true,
            "no" => has_no = true,
            _ => {}
        }
    }
    if has_yes && has_no {
        return vec!["Yes".to_string(), "No".to_string()];
    }

    if MENU_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return category_labels();
    }

    Vec::new()
}

#[cfg(test)]
mod proptests;
