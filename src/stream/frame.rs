//! Frame classification

use serde::Deserialize;
use thiserror::Error;

/// Prefix of a frame carrying an incremental text payload.
pub const DATA_PREFIX: &str = "data: ";

/// Exact body of the frame that ends the bot's turn.
pub const END_MARKER: &str = "event: end";

/// One logical record of the response stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Incremental text for the in-progress bot message
    Data { message: String },
    /// The bot's turn is complete
    End,
    /// Anything else. Ignored so the backend can add event kinds freely.
    Unrecognized { body: String },
}

/// Payload of a data frame. Fields other than `message` are ignored.
#[derive(Debug, Deserialize)]
struct DataPayload {
    message: String,
}

/// A data frame whose payload could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed data frame payload ({reason}): {payload}")]
pub struct FrameParseError {
    pub payload: String,
    pub reason: String,
}

impl Frame {
    /// Classify a frame body.
    ///
    /// The data prefix is checked first, then the end marker; any other body
    /// is `Unrecognized`. Only a data frame can fail to parse.
    pub fn parse(body: &str) -> Result<Self, FrameParseError> {
        if let Some(payload) = body.strip_prefix(DATA_PREFIX) {
            let data: DataPayload =
                serde_json::from_str(payload).map_err(|e| FrameParseError {
                    payload: payload.to_string(),
                    reason: e.to_string(),
                })?;
            return Ok(Frame::Data {
                message: data.message,
            });
        }

        if body == END_MARKER {
            return Ok(Frame::End);
        }

        Ok(Frame::Unrecognized {
            body: body.to_string(),
        })
    }
}
