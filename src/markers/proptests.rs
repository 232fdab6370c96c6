//! Property-based tests for the marker codec

use super::*;
use proptest::prelude::*;

/// Free text that may contain brackets, newlines and yes/no words
fn arb_reply() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-zA-Z .,?!]{0,20}",
            "\\[[a-zA-Z ]{0,12}\\]",
            Just("[".to_string()),
            Just("]".to_string()),
            Just("\n".to_string()),
            Just(" yes ".to_string()),
            Just(" no ".to_string()),
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_strip_is_idempotent(text in arb_reply()) {
        let once = strip_markers(&text);
        prop_assert_eq!(strip_markers(&once), once);
    }

    #[test]
    fn prop_stripped_text_has_no_delimiters(text in arb_reply()) {
        let stripped = strip_markers(&text);
        prop_assert!(!stripped.contains('['));
        prop_assert!(!stripped.contains(']'));
    }

    #[test]
    fn prop_extract_is_deterministic(text in arb_reply()) {
        prop_assert_eq!(extract_options(&text), extract_options(&text));
    }

    #[test]
    fn prop_options_are_trimmed_and_non_empty(text in arb_reply()) {
        for option in extract_options(&text) {
            prop_assert!(!option.is_empty());
            prop_assert_eq!(option.trim(), option.as_str());
        }
    }

    #[test]
    fn prop_labels_round_trip_in_order(labels in proptest::collection::vec("[a-zA-Z][a-zA-Z ]{0,10}[a-zA-Z]", 1..5)) {
        let text = format!(
            "Question?{}",
            labels.iter().map(|l| format!("[{l}]")).collect::<String>()
        );
        prop_assert_eq!(extract_options(&text), labels);
        prop_assert_eq!(strip_markers(&text), "Question?");
    }
}
