//! Chat runtime executor

use super::Envelope;
use crate::state_machine::{
    transition, ChatSnapshot, ChatState, ChatUpdate, Effect, Event, TurnId, TurnOutcome,
};
use crate::stream::{FrameSplitter, END_MARKER};
use crate::transport::ChatTransport;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Owns the chat state and executes the effects of each transition
pub struct ChatRuntime<T: ChatTransport + 'static> {
    session_id: String,
    state: ChatState,
    transport: Arc<T>,
    command_rx: mpsc::Receiver<Envelope>,
    /// Cloned into stream readers so their frames join the same queue
    command_tx: mpsc::Sender<Envelope>,
    updates_tx: broadcast::Sender<ChatUpdate>,
    snapshot_tx: watch::Sender<ChatSnapshot>,
    /// Token for the reply stream currently being read
    stream_cancel: Option<(TurnId, CancellationToken)>,
    shutdown: CancellationToken,
}

impl<T: ChatTransport + 'static> ChatRuntime<T> {
    pub fn new(
        session_id: String,
        transport: Arc<T>,
        command_rx: mpsc::Receiver<Envelope>,
        command_tx: mpsc::Sender<Envelope>,
        updates_tx: broadcast::Sender<ChatUpdate>,
        snapshot_tx: watch::Sender<ChatSnapshot>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            state: ChatState::new(),
            transport,
            command_rx,
            command_tx,
            updates_tx,
            snapshot_tx,
            stream_cancel: None,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session = %self.session_id, "Starting chat runtime");

        loop {
            let envelope = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                envelope = self.command_rx.recv() => envelope,
            };
            let Some(envelope) = envelope else { break };
            self.process(envelope);
        }

        if let Some((turn, token)) = self.stream_cancel.take() {
            tracing::debug!(%turn, "Cancelling reply stream on shutdown");
            token.cancel();
        }
        tracing::info!(session = %self.session_id, "Chat runtime stopped");
    }

    fn process(&mut self, envelope: Envelope) {
        let Envelope { event, reply } = envelope;

        let outcome = match transition(&mut self.state, event) {
            Ok(result) => {
                // Publish before any notification goes out or the caller is
                // answered, so whoever hears about a change sees it in the
                // snapshot
                if result.changed() {
                    self.snapshot_tx.send_replace(self.state.snapshot());
                }
                for effect in result.effects {
                    self.execute_effect(effect);
                }
                Ok(())
            }
            Err(e) => {
                tracing::debug!(session = %self.session_id, error = %e, "Event rejected");
                Err(e)
            }
        };

        if let Some(reply) = reply {
            // Caller may have stopped waiting
            let _ = reply.send(outcome);
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::OpenStream { turn, message } => {
                let cancel = CancellationToken::new();
                if let Some((old_turn, old)) = self.stream_cancel.replace((turn, cancel.clone())) {
                    tracing::debug!(turn = %old_turn, "Dropping previous reply stream");
                    old.cancel();
                }

                tracing::info!(
                    session = %self.session_id,
                    %turn,
                    chars = message.chars().count(),
                    "Opening reply stream"
                );
                tokio::spawn(read_stream(
                    Arc::clone(&self.transport),
                    turn,
                    message,
                    self.command_tx.clone(),
                    cancel,
                ));
            }

            Effect::CancelStream { turn } => match self.stream_cancel.take() {
                Some((current, token)) if current == turn => {
                    tracing::info!(session = %self.session_id, %turn, "Cancelling reply stream");
                    token.cancel();
                }
                other => self.stream_cancel = other,
            },

            Effect::ReportMalformedFrame { turn, error } => {
                tracing::warn!(
                    session = %self.session_id,
                    %turn,
                    reason = %error.reason,
                    payload_len = error.payload.len(),
                    "Dropping malformed data frame"
                );
            }

            Effect::Notify(update) => {
                if let ChatUpdate::TurnFinished { turn, outcome } = &update {
                    let turn = *turn;
                    // The reader has stopped or is about to; release its token
                    if let Some((_, token)) =
                        self.stream_cancel.take_if(|(current, _)| *current == turn)
                    {
                        token.cancel();
                    }
                    self.log_turn_finished(turn, outcome);
                }
                // No subscribers is fine
                let _ = self.updates_tx.send(update);
            }
        }
    }

    fn log_turn_finished(&self, turn: TurnId, outcome: &TurnOutcome) {
        match outcome {
            TurnOutcome::Failed { error } => tracing::error!(
                session = %self.session_id,
                %turn,
                kind = ?error.kind,
                status = error.kind.status_code(),
                mid_stream = error.kind.is_mid_stream(),
                error = %error,
                "Reply stream failed"
            ),
            other => tracing::info!(
                session = %self.session_id,
                %turn,
                outcome = other.label(),
                messages = self.state.messages().len(),
                "Turn finished"
            ),
        }
    }
}

/// Read one turn's reply stream, forwarding each complete frame.
///
/// Suspends only on opening the stream and on each chunk read; both race the
/// cancellation token. Stops after the end frame.
async fn read_stream<T: ChatTransport + ?Sized>(
    transport: Arc<T>,
    turn: TurnId,
    message: String,
    tx: mpsc::Sender<Envelope>,
    cancel: CancellationToken,
) {
    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!(%turn, "Reply stream cancelled before it opened");
            return;
        }
        result = transport.open(&message) => result,
    };

    let mut chunks = match opened {
        Ok(chunks) => chunks,
        Err(error) => {
            let _ = tx
                .send(Envelope::new(Event::TransportFailed { turn, error }))
                .await;
            return;
        }
    };

    let mut splitter = FrameSplitter::new();
    let mut frames = 0usize;
    let mut bytes = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(
                    %turn,
                    frames,
                    bytes,
                    carry = splitter.pending().len(),
                    "Reply stream cancelled"
                );
                return;
            }
            next = chunks.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                bytes += chunk.len();
                for body in splitter.push(&chunk) {
                    frames += 1;
                    let is_end = body == END_MARKER;
                    if tx.send(Envelope::new(Event::frame(turn, body))).await.is_err() {
                        // Runtime gone
                        return;
                    }
                    if is_end {
                        tracing::debug!(%turn, frames, bytes, "End frame received");
                        return;
                    }
                }
            }
            Some(Err(error)) => {
                tracing::debug!(%turn, frames, bytes, error = %error, "Reply stream broke");
                let _ = tx
                    .send(Envelope::new(Event::TransportFailed { turn, error }))
                    .await;
                return;
            }
            None => {
                if let Some(rest) = splitter.finish() {
                    tracing::debug!(
                        %turn,
                        discarded = rest.len(),
                        "Discarding unterminated trailing frame"
                    );
                }
                tracing::debug!(%turn, frames, bytes, "Reply stream closed");
                let _ = tx.send(Envelope::new(Event::StreamClosed { turn })).await;
                return;
            }
        }
    }
}
