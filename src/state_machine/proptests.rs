//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all event sequences:
//! - At most one active message, always last and from the bot
//! - Sealed messages never change
//! - `composing` only while waiting for the first reply text
//! - The state matches a straightforward reference model

use super::state::*;
use super::transition::*;
use super::*;
use crate::transport::TransportError;
use proptest::prelude::*;

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone)]
enum Action {
    Submit(String),
    Cancel,
    Data(String),
    Malformed,
    Unknown,
    End,
    Closed,
    Failed,
    /// Data frame from a turn that is not the current one
    Stale(String),
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{0,8}"
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => arb_text().prop_map(Action::Submit),
        1 => Just(Action::Cancel),
        6 => arb_text().prop_map(Action::Data),
        1 => Just(Action::Malformed),
        1 => Just(Action::Unknown),
        2 => Just(Action::End),
        1 => Just(Action::Closed),
        1 => Just(Action::Failed),
        1 => arb_text().prop_map(Action::Stale),
    ]
}

fn data_body(text: &str) -> String {
    format!("data: {}", serde_json::json!({ "message": text }))
}

fn to_event(action: &Action, turn: TurnId) -> Event {
    match action {
        Action::Submit(text) => Event::user_message(text.clone()),
        Action::Cancel => Event::UserCancel,
        Action::Data(text) => Event::frame(turn, data_body(text)),
        Action::Malformed => Event::frame(turn, "data: {\"message\":"),
        Action::Unknown => Event::frame(turn, "event: ping"),
        Action::End => Event::frame(turn, "event: end"),
        Action::Closed => Event::StreamClosed { turn },
        Action::Failed => Event::TransportFailed {
            turn,
            error: TransportError::body("reset"),
        },
        Action::Stale(text) => Event::frame(TurnId::default(), data_body(text)),
    }
}

// ============================================================================
// Reference model
// ============================================================================

#[derive(Debug, Default)]
struct Model {
    messages: Vec<Message>,
    active: bool,
    in_turn: bool,
    composing: bool,
}

impl Model {
    /// Returns false when the action must be rejected
    fn apply(&mut self, action: &Action) -> bool {
        match action {
            Action::Submit(text) => {
                if text.trim().is_empty() || self.in_turn {
                    return false;
                }
                self.messages.push(Message::user(text.clone()));
                self.active = false;
                self.in_turn = true;
                self.composing = true;
            }
            Action::Cancel => {
                if !self.in_turn {
                    return false;
                }
                self.end_turn();
            }
            Action::Data(text) if self.in_turn => {
                if self.active {
                    if let Some(last) = self.messages.last_mut() {
                        last.text.push_str(text);
                    }
                } else {
                    self.messages.push(Message::bot(text.clone()));
                    self.active = true;
                }
                self.composing = false;
            }
            Action::End | Action::Closed | Action::Failed if self.in_turn => self.end_turn(),
            _ => {}
        }
        true
    }

    fn end_turn(&mut self) {
        self.active = false;
        self.in_turn = false;
        self.composing = false;
    }
}

// ============================================================================
// Invariants
// ============================================================================

fn active_message_is_last_bot(state: &ChatState) -> bool {
    match state.active_index() {
        None => true,
        Some(index) => {
            index + 1 == state.messages().len()
                && state.messages()[index].sender == Sender::Bot
                && state.messages()[index].text == state.pending_bot_text()
        }
    }
}

fn composing_matches_phase(state: &ChatState) -> bool {
    state.composing() == (state.phase() == Phase::Composing)
        && (state.active_index().is_none() || !state.composing())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // State always agrees with the reference model
    #[test]
    fn prop_matches_reference_model(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut state = ChatState::new();
        let mut model = Model::default();

        for action in &actions {
            let accepted = model.apply(action);
            let event = to_event(action, state.turn());
            let result = transition(&mut state, event);
            prop_assert_eq!(result.is_ok(), accepted, "action {:?}", action);
            prop_assert_eq!(state.messages(), model.messages.as_slice());
            prop_assert_eq!(state.composing(), model.composing);
            prop_assert_eq!(state.is_turn_in_progress(), model.in_turn);
        }
    }

    // Structural invariants hold after every transition
    #[test]
    fn prop_invariants_hold(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut state = ChatState::new();

        for action in &actions {
            let before: Vec<Message> = state.messages().to_vec();
            let sealed_before = before.len() - usize::from(state.active_index().is_some());

            let event = to_event(action, state.turn());
            let _ = transition(&mut state, event);

            prop_assert!(active_message_is_last_bot(&state), "state {:?}", state);
            prop_assert!(composing_matches_phase(&state), "state {:?}", state);
            prop_assert!(state.messages().len() >= before.len());
            prop_assert_eq!(&state.messages()[..sealed_before], &before[..sealed_before]);
        }
    }

    // Rejected events leave the state untouched
    #[test]
    fn prop_rejection_is_side_effect_free(
        actions in proptest::collection::vec(arb_action(), 0..30)
    ) {
        let mut state = ChatState::new();

        for action in &actions {
            let before = state.clone();
            let event = to_event(action, state.turn());
            if transition(&mut state, event).is_err() {
                prop_assert_eq!(state.snapshot(), before.snapshot());
                prop_assert_eq!(state.turn(), before.turn());
                prop_assert_eq!(state.pending_bot_text(), before.pending_bot_text());
            }
        }
    }

    // Every finished turn reports exactly one TurnFinished notification
    #[test]
    fn prop_turn_finished_once_per_turn(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut state = ChatState::new();
        let mut started = 0usize;
        let mut finished = 0usize;

        for action in &actions {
            let event = to_event(action, state.turn());
            if let Ok(result) = transition(&mut state, event) {
                for effect in &result.effects {
                    match effect {
                        Effect::OpenStream { .. } => started += 1,
                        Effect::Notify(ChatUpdate::TurnFinished { .. }) => finished += 1,
                        _ => {}
                    }
                }
            }
        }

        let open = usize::from(state.is_turn_in_progress());
        prop_assert_eq!(started, finished + open);
    }
}
