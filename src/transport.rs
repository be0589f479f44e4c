//! Chat backend transport
//!
//! The accumulator never talks to the network directly. A transport opens
//! one response stream per turn and hands back decoded text chunks; the
//! stream ending is the stream-closed signal.

mod decode;
mod error;
mod http;

pub use decode::Utf8ChunkDecoder;
pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Decoded text chunks in arrival order
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Opens the response stream for one user message
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `message` and return the streamed reply
    async fn open(&self, message: &str) -> Result<ChunkStream, TransportError>;
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for Arc<T> {
    async fn open(&self, message: &str) -> Result<ChunkStream, TransportError> {
        (**self).open(message).await
    }
}
