//! Events that can occur in a chat session

use super::state::TurnId;
use crate::transport::TransportError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },
    UserCancel,

    // Stream events, tagged with the turn whose stream produced them
    Frame {
        turn: TurnId,
        body: String,
    },
    StreamClosed {
        turn: TurnId,
    },
    TransportFailed {
        turn: TurnId,
        error: TransportError,
    },
}

impl Event {
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage { text: text.into() }
    }

    pub fn frame(turn: TurnId, body: impl Into<String>) -> Self {
        Event::Frame {
            turn,
            body: body.into(),
        }
    }
}
