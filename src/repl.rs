//! Terminal rendering of a streaming reply

use crate::state_machine::{ChatUpdate, Sender, TurnOutcome};
use std::io::{self, Write};
use tokio::sync::broadcast;

const BOT_PROMPT: &str = "bot> ";
const COMPOSING_INDICATOR: &str = "bot> ...";
/// Carriage return plus erase-line, to replace the composing indicator
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Writes one turn's updates to a terminal as they arrive.
///
/// Reply text is printed incrementally; only the suffix not yet shown is
/// written on each update.
pub struct TurnRenderer<W: Write> {
    out: W,
    indicator_shown: bool,
    line_open: bool,
    replied: bool,
    printed: usize,
}

impl<W: Write> TurnRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            indicator_shown: false,
            line_open: false,
            replied: false,
            printed: 0,
        }
    }

    /// Render one update. Returns true once the turn has finished.
    pub fn render(&mut self, update: &ChatUpdate) -> io::Result<bool> {
        match update {
            ChatUpdate::ComposingChanged { composing: true } => {
                write!(self.out, "{COMPOSING_INDICATOR}")?;
                self.indicator_shown = true;
            }
            ChatUpdate::ComposingChanged { composing: false } => self.clear_indicator()?,
            // The user's own line is already on screen
            ChatUpdate::MessageAppended { message, .. } if message.sender == Sender::User => {}
            ChatUpdate::MessageAppended { message, .. } => {
                self.clear_indicator()?;
                write!(self.out, "{BOT_PROMPT}{}", message.text)?;
                self.line_open = true;
                self.replied = true;
                self.printed = message.text.len();
            }
            ChatUpdate::MessageUpdated { text, .. } => {
                if let Some(suffix) = text.get(self.printed..) {
                    write!(self.out, "{suffix}")?;
                }
                self.printed = text.len();
            }
            ChatUpdate::MessageSealed { .. } => self.end_line()?,
            ChatUpdate::TurnFinished { outcome, .. } => {
                self.clear_indicator()?;
                self.end_line()?;
                self.render_outcome(outcome)?;
                self.out.flush()?;
                return Ok(true);
            }
        }
        self.out.flush()?;
        Ok(false)
    }

    fn render_outcome(&mut self, outcome: &TurnOutcome) -> io::Result<()> {
        match outcome {
            TurnOutcome::Completed if self.replied => Ok(()),
            TurnOutcome::Completed => writeln!(self.out, "(no reply)"),
            TurnOutcome::Closed => writeln!(self.out, "[reply ended unexpectedly]"),
            TurnOutcome::Cancelled => writeln!(self.out, "[cancelled]"),
            TurnOutcome::Failed { error } => writeln!(self.out, "[error: {error}]"),
        }
    }

    fn clear_indicator(&mut self) -> io::Result<()> {
        if self.indicator_shown {
            write!(self.out, "{CLEAR_LINE}")?;
            self.indicator_shown = false;
        }
        Ok(())
    }

    fn end_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Drop every update still buffered in `updates`.
///
/// Used after the renderer lagged and gave up on a turn, so the next turn
/// does not start from the tail of the previous one.
pub fn discard_pending(updates: &mut broadcast::Receiver<ChatUpdate>) {
    *updates = updates.resubscribe();
}
