//! HTTP transport backed by reqwest

use super::{ChatTransport, ChunkStream, TransportError, Utf8ChunkDecoder};
use crate::config::ChatConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

/// Posts each user message to `{base_url}/chat` and streams the body
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &ChatConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: chat_endpoint(&config.backend_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat", base_url.trim_end_matches('/'))
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, message: &str) -> Result<ChunkStream, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::status(
                status.as_u16(),
                format!("HTTP {status}: {body}"),
            ));
        }

        tracing::debug!(endpoint = %self.endpoint, %status, "Response stream opened");

        let body = Box::pin(response.bytes_stream());
        let chunks = futures::stream::unfold(
            (body, Some(Utf8ChunkDecoder::new())),
            |(mut body, mut decoder)| async move {
                let Some(current) = decoder.as_mut() else {
                    return None;
                };
                match body.next().await {
                    Some(Ok(bytes)) => {
                        let text = current.decode(&bytes);
                        Some((Ok(text), (body, decoder)))
                    }
                    Some(Err(e)) => Some((Err(TransportError::from_reqwest(&e)), (body, None))),
                    // Flush a dangling partial code point, then end
                    None => decoder
                        .take()
                        .and_then(Utf8ChunkDecoder::finish)
                        .map(|tail| (Ok(tail), (body, None))),
                }
            },
        );

        Ok(Box::pin(chunks))
    }
}
