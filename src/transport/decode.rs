//! Incremental UTF-8 decoding of network reads

/// Decodes a byte stream into text without splitting code points.
///
/// A multi-byte sequence cut by a read boundary is held back until the next
/// read completes it. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    partial: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one read, returning all text that is complete so far.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.partial.extend_from_slice(bytes);
        let mut out = String::new();
        let mut input = std::mem::take(&mut self.partial);
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // Bytes up to valid_up_to() are UTF-8 by definition
                    out.push_str(&String::from_utf8_lossy(valid));
                    if let Some(bad) = e.error_len() {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = after.get(bad..).unwrap_or_default();
                    } else {
                        // Incomplete sequence at the end; wait for more bytes
                        rest = after;
                        break;
                    }
                }
            }
        }

        let keep = rest.len();
        input.drain(..input.len() - keep);
        self.partial = input;
        out
    }

    /// End of stream. A dangling incomplete sequence becomes U+FFFD.
    pub fn finish(self) -> Option<String> {
        if self.partial.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.partial).into_owned())
        }
    }
}
