//! Chat Stream - terminal client for a streaming chat backend
//!
//! Sends each line typed by the user to the backend and renders the reply
//! as its frames arrive.

mod config;
mod repl;
mod runtime;
mod state_machine;
mod stream;
mod transport;

use config::ChatConfig;
use repl::{discard_pending, TurnRenderer};
use runtime::{ChatSession, SessionError};
use state_machine::ChatUpdate;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::HttpTransport;

const QUIT_COMMAND: &str = "/quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they stay out of the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_stream=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ChatConfig::from_env();
    let transport = HttpTransport::new(&config)?;
    tracing::info!(endpoint = %transport.endpoint(), "Using chat backend");

    let session = ChatSession::spawn(transport);
    let mut updates = session.subscribe();
    tracing::info!(session = %session.id(), "Chat session started");

    println!(
        "Connected to {}. Type a message, or {QUIT_COMMAND} to exit.",
        config.backend_url
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == QUIT_COMMAND {
            break;
        }
        if line.is_empty() {
            continue;
        }

        match session.submit_user_message(line).await {
            Ok(()) => render_turn(&session, &mut updates).await?,
            Err(SessionError::Closed) => {
                eprintln!("Chat session has shut down");
                break;
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Print updates until the turn finishes; Ctrl-C abandons the reply
async fn render_turn(
    session: &ChatSession,
    updates: &mut broadcast::Receiver<ChatUpdate>,
) -> std::io::Result<()> {
    let mut renderer = TurnRenderer::new(std::io::stdout());

    loop {
        let update = tokio::select! {
            update = updates.recv() => update,
            _ = tokio::signal::ctrl_c() => {
                if let Err(e) = session.cancel_turn().await {
                    tracing::debug!(error = %e, "Nothing to cancel");
                }
                continue;
            }
        };

        match update {
            Ok(update) => {
                if renderer.render(&update)? {
                    return Ok(());
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Renderer fell behind; some updates were skipped");
                if !session.snapshot().turn_in_progress {
                    discard_pending(updates);
                    println!();
                    return Ok(());
                }
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}
