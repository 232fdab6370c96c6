//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::*;
use crate::db::Role;
use crate::llm::ERROR_SENTINEL;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn ctx() -> DialogueContext {
    DialogueContext::default()
}

/// Run one event through the machine, applying data effects like the runtime does
fn step(
    state: DialogueState,
    conversation: &mut Conversation,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    let result = transition(state, conversation, &ctx(), event)?;
    for effect in &result.effects {
        conversation.apply(effect);
    }
    Ok(result)
}

fn request_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::RequestReply { .. }))
        .count()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_user_text() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-zA-Z0-9 ]{1,20}",
        1 => Just(String::new()),
        1 => Just("   ".to_string()),
        1 => Just("Restart".to_string()),
    ]
}

fn arb_reply_text() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-zA-Z .?]{1,30}",
        1 => "[a-zA-Z ]{1,10}".prop_map(|l| format!("Pick one [{l}]")),
        1 => Just("Please press CONNECT WITH CONSULTANT below.".to_string()),
        1 => "[a-z ]{0,20}".prop_map(|d| format!("{ERROR_SENTINEL}{d}")),
    ]
}

fn arb_state() -> impl Strategy<Value = DialogueState> {
    prop_oneof![
        Just(DialogueState::Init),
        Just(DialogueState::Loading),
        Just(DialogueState::Idle),
        Just(DialogueState::Finalized),
        Just(DialogueState::Errored),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => arb_user_text().prop_map(|text| Event::UserSubmit { text }),
        3 => (arb_reply_text(), 0usize..3)
            .prop_map(|(text, candidate_index)| Event::ModelReply { text, candidate_index }),
        1 => Just(Event::Reset),
        1 => Just(Event::FreshStart),
        1 => (any::<bool>(), any::<bool>())
            .prop_map(|(finalized, errored)| Event::Restored { finalized, errored }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: a request is issued exactly when entering Loading
    #[test]
    fn prop_requests_only_when_loading(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(state, &Conversation::default(), &ctx(), event) {
            let requests = request_count(&result.effects);
            if result.new_state == DialogueState::Loading {
                prop_assert_eq!(requests, 1);
            } else {
                prop_assert_eq!(requests, 0);
            }
        }
    }

    // Invariant 2: submit while loading is always a no-op
    #[test]
    fn prop_submit_while_loading_is_rejected(text in arb_user_text()) {
        let result = transition(DialogueState::Loading, &Conversation::default(), &ctx(), Event::UserSubmit { text });
        prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
    }

    // Invariant 3: accepted submit in Idle appends exactly one user turn
    #[test]
    fn prop_idle_submit_appends_one_user_turn(text in "[a-zA-Z0-9]{1,20}") {
        prop_assume!(!ctx().is_restart(&text));
        let mut conv = Conversation::default();
        conv.apply(&Effect::append_model("Your name?"));

        step(DialogueState::Idle, &mut conv, Event::UserSubmit { text: text.clone() }).unwrap();

        prop_assert_eq!(conv.turns.len(), 2);
        prop_assert_eq!(conv.turns[1].role, Role::User);
        prop_assert_eq!(&conv.turns[1].text, &text);
    }

    // Invariant 4: a reply appends exactly one model turn and leaves Loading
    #[test]
    fn prop_reply_appends_one_model_turn(text in arb_reply_text()) {
        let mut conv = Conversation::default();
        let result = step(
            DialogueState::Loading,
            &mut conv,
            Event::ModelReply { text, candidate_index: 0 },
        ).unwrap();

        prop_assert_ne!(result.new_state, DialogueState::Loading);
        prop_assert_eq!(conv.turns.len(), 1);
        prop_assert_eq!(conv.turns[0].role, Role::Model);
        prop_assert_eq!(result.effects.last(), Some(&Effect::PersistSnapshot));
        prop_assert_eq!(conv.finalized, result.new_state == DialogueState::Finalized);
        prop_assert_eq!(conv.errored, result.new_state == DialogueState::Errored);
    }

    // Invariant 5: whole sessions keep flags consistent with the state
    #[test]
    fn prop_sessions_stay_consistent(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = DialogueState::Init;
        let mut conv = Conversation::default();

        for event in events {
            let turns_before = conv.turns.len();
            let state_before = state;
            match step(state, &mut conv, event) {
                Ok(result) => state = result.new_state,
                Err(_) => {
                    // Rejected events change nothing
                    prop_assert_eq!(state, state_before);
                    prop_assert_eq!(conv.turns.len(), turns_before);
                }
            }

            match state {
                DialogueState::Finalized => prop_assert!(conv.finalized || conv.turns.len() == 1),
                DialogueState::Idle => {
                    prop_assert!(!conv.finalized);
                    prop_assert!(!conv.errored);
                }
                _ => {}
            }
        }
    }

    // Invariant 6: data effects never perform I/O and vice versa
    #[test]
    fn prop_io_effects_leave_conversation_alone(state in arb_state(), event in arb_event()) {
        let mut conv = Conversation::default();
        conv.apply(&Effect::append_model("hello"));
        if let Ok(result) = transition(state, &conv, &ctx(), event) {
            for effect in result.effects.iter().filter(|e| e.is_io()) {
                let before = conv.clone();
                conv.apply(effect);
                prop_assert_eq!(&conv, &before);
            }
        }
    }
}
