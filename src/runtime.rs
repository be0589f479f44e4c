//! Runtime for a chat session
//!
//! One task owns the chat state and applies events strictly one at a time;
//! reply streams are read by per-turn tasks that feed frames back into the
//! same queue. The UI holds a [`ChatSession`] handle.

mod executor;


pub use executor::ChatRuntime;

use crate::state_machine::{ChatSnapshot, ChatUpdate, Event, TransitionError};
use crate::transport::ChatTransport;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const COMMAND_BUFFER: usize = 64;
const UPDATE_BUFFER: usize = 256;

/// An event on its way to the runtime, with an optional reply channel for
/// the caller that submitted it
#[derive(Debug)]
pub struct Envelope {
    pub event: Event,
    pub reply: Option<oneshot::Sender<Result<(), TransitionError>>>,
}

impl Envelope {
    pub fn new(event: Event) -> Self {
        Self { event, reply: None }
    }
}

/// Errors surfaced to the UI by session calls
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Chat session has shut down")]
    Closed,
}

/// Handle to a running chat session
pub struct ChatSession {
    session_id: String,
    command_tx: mpsc::Sender<Envelope>,
    updates_tx: broadcast::Sender<ChatUpdate>,
    snapshot_rx: watch::Receiver<ChatSnapshot>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ChatSession {
    /// Start a session runtime in the background
    pub fn spawn<T: ChatTransport + 'static>(transport: T) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (updates_tx, _) = broadcast::channel(UPDATE_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(ChatSnapshot::default());
        let shutdown = CancellationToken::new();

        let runtime = ChatRuntime::new(
            session_id.clone(),
            Arc::new(transport),
            command_rx,
            command_tx.clone(),
            updates_tx.clone(),
            snapshot_tx,
            shutdown.clone(),
        );

        let id = session_id.clone();
        let handle = tokio::spawn(async move {
            runtime.run().await;
            tracing::info!(session = %id, "Chat runtime finished");
        });

        Self {
            session_id,
            command_tx,
            updates_tx,
            snapshot_rx,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// Send a user message and start streaming the reply.
    ///
    /// Returns once the message is part of the conversation; the reply
    /// arrives through [`Self::subscribe`] and [`Self::watch`].
    pub async fn submit_user_message(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.request(Event::user_message(text)).await
    }

    /// Abandon the reply that is currently streaming
    pub async fn cancel_turn(&self) -> Result<(), SessionError> {
        self.request(Event::UserCancel).await
    }

    async fn request(&self, event: Event) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Envelope {
                event,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }

    /// Current messages and composing flag
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that observes every published snapshot
    #[allow(dead_code)] // For UIs that redraw from state rather than updates
    pub fn watch(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Fine-grained change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ChatUpdate> {
        self.updates_tx.subscribe()
    }

    /// Wait until no turn is in progress and return the state at that point
    #[allow(dead_code)]
    pub async fn wait_until_idle(&self) -> Result<ChatSnapshot, SessionError> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx
            .wait_for(|s| !s.turn_in_progress)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Stop the runtime, cancelling any reply still streaming
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(session = %self.session_id, error = %e, "Chat runtime panicked");
            }
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
