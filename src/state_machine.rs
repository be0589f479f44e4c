//! Message accumulation state machine
//!
//! Implements the Elm Architecture pattern: `transition` applies one event to
//! the chat state and returns the effects the runtime must carry out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{ChatUpdate, Effect};
pub use event::Event;
pub use state::{ChatSnapshot, ChatState, Message, Phase, Sender, TurnId, TurnOutcome};
pub use transition::{transition, TransitionError, TransitionResult};
