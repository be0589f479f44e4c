//! Effects produced by state transitions

use super::state::{Message, TurnId, TurnOutcome};
use crate::stream::FrameParseError;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send the user message and start reading the reply stream
    OpenStream { turn: TurnId, message: String },

    /// Stop reading the turn's reply stream
    CancelStream { turn: TurnId },

    /// A data frame was dropped because its payload was malformed
    ReportMalformedFrame { turn: TurnId, error: FrameParseError },

    /// Notify observers
    Notify(ChatUpdate),
}

/// Incremental change notifications for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    MessageAppended { index: usize, message: Message },
    /// Full text of the active message after an append
    MessageUpdated { index: usize, text: String },
    MessageSealed { index: usize },
    ComposingChanged { composing: bool },
    TurnFinished { turn: TurnId, outcome: TurnOutcome },
}

impl Effect {
    pub fn notify_appended(index: usize, message: Message) -> Self {
        Effect::Notify(ChatUpdate::MessageAppended { index, message })
    }

    pub fn notify_updated(index: usize, text: impl Into<String>) -> Self {
        Effect::Notify(ChatUpdate::MessageUpdated {
            index,
            text: text.into(),
        })
    }

    pub fn notify_sealed(index: usize) -> Self {
        Effect::Notify(ChatUpdate::MessageSealed { index })
    }

    pub fn notify_composing(composing: bool) -> Self {
        Effect::Notify(ChatUpdate::ComposingChanged { composing })
    }

    pub fn notify_turn_finished(turn: TurnId, outcome: TurnOutcome) -> Self {
        Effect::Notify(ChatUpdate::TurnFinished { turn, outcome })
    }

    pub fn is_notify(&self) -> bool {
        matches!(self, Effect::Notify(_))
    }
}
