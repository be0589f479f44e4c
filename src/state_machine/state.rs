//! Chat state types

use crate::transport::TransportError;
use std::fmt;

// ============================================================================
// Messages
// ============================================================================

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}

// ============================================================================
// Turns
// ============================================================================

/// Identifies one user turn. Events from an abandoned turn's stream carry a
/// stale id and are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TurnId(u64);

impl TurnId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the current turn stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No turn in progress; ready for user input
    #[default]
    Idle,
    /// User message sent, no reply text yet
    Composing,
    /// Reply text is arriving
    Streaming,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// End frame received
    Completed,
    /// The stream closed without an end frame
    Closed,
    /// Abandoned by the user
    Cancelled,
    /// The transport failed; whatever arrived before the failure is kept
    Failed { error: TransportError },
}

impl TurnOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Completed => "completed",
            TurnOutcome::Closed => "closed",
            TurnOutcome::Cancelled => "cancelled",
            TurnOutcome::Failed { .. } => "failed",
        }
    }
}

// ============================================================================
// Chat state
// ============================================================================

/// Accumulated conversation.
///
/// At most one message is active (still receiving text). When there is one,
/// it is the last message and was sent by the bot; `active` holds its index.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    messages: Vec<Message>,
    /// Reply text received since the last seal
    pending_bot_text: String,
    active: Option<usize>,
    phase: Phase,
    turn: TurnId,
    last_outcome: Option<TurnOutcome>,
}

/// Result of appending reply text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BotAppend {
    Created(usize),
    Updated(usize),
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// True while waiting for the first reply text of a turn
    pub fn composing(&self) -> bool {
        self.phase == Phase::Composing
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> TurnId {
        self.turn
    }

    pub fn is_turn_in_progress(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn pending_bot_text(&self) -> &str {
        &self.pending_bot_text
    }

    #[allow(dead_code)] // Inspected by tests
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    #[allow(dead_code)]
    pub fn active_message(&self) -> Option<&Message> {
        self.active.and_then(|index| self.messages.get(index))
    }

    #[allow(dead_code)]
    pub fn last_outcome(&self) -> Option<&TurnOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.messages.clone(),
            composing: self.composing(),
            turn_in_progress: self.is_turn_in_progress(),
            last_outcome: self.last_outcome.clone(),
        }
    }

    // ------------------------------------------------------------------------
    // Mutations, driven only by `transition`
    // ------------------------------------------------------------------------

    /// Start a new turn with a sealed user message. Returns the message index.
    pub(super) fn begin_turn(&mut self, text: String) -> usize {
        self.active = None;
        self.pending_bot_text.clear();
        self.messages.push(Message::user(text));
        self.phase = Phase::Composing;
        self.turn = self.turn.next();
        self.messages.len() - 1
    }

    /// Append reply text, creating the active bot message on first use.
    pub(super) fn append_bot_text(&mut self, text: &str) -> BotAppend {
        self.pending_bot_text.push_str(text);
        self.phase = Phase::Streaming;

        if let Some(index) = self.active {
            if let Some(message) = self.messages.get_mut(index) {
                message.text.clone_from(&self.pending_bot_text);
                return BotAppend::Updated(index);
            }
        }

        self.messages.push(Message::bot(self.pending_bot_text.clone()));
        let index = self.messages.len() - 1;
        self.active = Some(index);
        BotAppend::Created(index)
    }

    /// End the current turn. Returns the index of the message sealed, if any.
    pub(super) fn finish_turn(&mut self, outcome: TurnOutcome) -> Option<usize> {
        self.pending_bot_text.clear();
        self.phase = Phase::Idle;
        self.last_outcome = Some(outcome);
        self.active.take()
    }
}

/// Read-only view published to the UI after every change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub messages: Vec<Message>,
    pub composing: bool,
    pub turn_in_progress: bool,
    pub last_outcome: Option<TurnOutcome>,
}

impl ChatSnapshot {
    #[allow(dead_code)] // Used by tests
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
