//! State transition function
//!
//! Every mutation of the chat state goes through here: user submissions,
//! cancellation, and the frames of the reply stream. The function performs
//! no I/O; network and notification work is returned as effects.

use super::state::{BotAppend, ChatState, Message, Phase, TurnId, TurnOutcome};
use super::{Effect, Event};
use crate::stream::Frame;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, Default)]
pub struct TransitionResult {
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Whether observers need to hear about this transition
    pub fn changed(&self) -> bool {
        self.effects.iter().any(Effect::is_notify)
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("A reply is still streaming (cancel it first)")]
    TurnInProgress,
    #[error("No turn in progress")]
    NoActiveTurn,
}

/// Apply one event to the chat state.
///
/// Rejected events leave the state untouched. Stream events for a turn that
/// is no longer in progress are stale and produce no effects.
pub fn transition(
    state: &mut ChatState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        Event::UserMessage { text } => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if state.is_turn_in_progress() {
                return Err(TransitionError::TurnInProgress);
            }

            let index = state.begin_turn(text.clone());
            let turn = state.turn();
            Ok(TransitionResult::new()
                .with_effect(Effect::notify_appended(index, Message::user(text.clone())))
                .with_effect(Effect::notify_composing(true))
                .with_effect(Effect::OpenStream {
                    turn,
                    message: text,
                }))
        }

        Event::UserCancel => {
            if !state.is_turn_in_progress() {
                return Err(TransitionError::NoActiveTurn);
            }
            let turn = state.turn();
            Ok(TransitionResult::new()
                .with_effect(Effect::CancelStream { turn })
                .with_effects(finish_turn(state, TurnOutcome::Cancelled).effects))
        }

        Event::Frame { turn, body } => {
            if is_stale(state, turn) {
                return Ok(TransitionResult::new());
            }
            match Frame::parse(&body) {
                Ok(Frame::Data { message }) => Ok(apply_data(state, &message)),
                Ok(Frame::End) => Ok(finish_turn(state, TurnOutcome::Completed)),
                Ok(Frame::Unrecognized { body }) => {
                    tracing::debug!(%turn, len = body.len(), "Ignoring unrecognized frame");
                    Ok(TransitionResult::new())
                }
                Err(error) => Ok(TransitionResult::new()
                    .with_effect(Effect::ReportMalformedFrame { turn, error })),
            }
        }

        Event::StreamClosed { turn } => {
            if is_stale(state, turn) {
                return Ok(TransitionResult::new());
            }
            Ok(finish_turn(state, TurnOutcome::Closed))
        }

        Event::TransportFailed { turn, error } => {
            if is_stale(state, turn) {
                return Ok(TransitionResult::new());
            }
            Ok(finish_turn(state, TurnOutcome::Failed { error }))
        }
    }
}

fn is_stale(state: &ChatState, turn: TurnId) -> bool {
    turn != state.turn() || !state.is_turn_in_progress()
}

fn apply_data(state: &mut ChatState, text: &str) -> TransitionResult {
    let was_composing = state.composing();

    let update = match state.append_bot_text(text) {
        BotAppend::Created(index) => {
            Effect::notify_appended(index, Message::bot(state.pending_bot_text()))
        }
        BotAppend::Updated(index) => Effect::notify_updated(index, state.pending_bot_text()),
    };

    let result = TransitionResult::new().with_effect(update);
    if was_composing {
        result.with_effect(Effect::notify_composing(false))
    } else {
        result
    }
}

/// Seal the active message and close the turn
fn finish_turn(state: &mut ChatState, outcome: TurnOutcome) -> TransitionResult {
    let was_composing = state.phase() == Phase::Composing;
    let turn = state.turn();
    let sealed = state.finish_turn(outcome.clone());

    TransitionResult::new()
        .with_effects(sealed.map(Effect::notify_sealed))
        .with_effects(was_composing.then(|| Effect::notify_composing(false)))
        .with_effect(Effect::notify_turn_finished(turn, outcome))
}
