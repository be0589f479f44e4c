//! Delimiter-based frame splitting with carry-over between chunks

/// Blank line separating two frames.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Splits a chunked text stream into complete frames.
///
/// Whatever follows the last delimiter seen so far is kept as carry-over and
/// prefixed onto the next chunk, so a frame (or the delimiter itself) may be
/// cut anywhere by the network without being lost or duplicated.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    carry: String,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning the frames it completes in arrival order.
    ///
    /// A chunk without a delimiter completes nothing and only grows the
    /// carry-over.
    pub fn push(&mut self, chunk: &str) -> Frames {
        self.carry.push_str(chunk);

        // Same leftmost, non-overlapping matching as `str::split`, so the
        // result does not depend on where chunk boundaries fall.
        let Some((last, _)) = self.carry.match_indices(FRAME_DELIMITER).last() else {
            return Frames::empty();
        };

        let buffer = std::mem::take(&mut self.carry);
        let (complete, rest) = buffer.split_at(last);
        self.carry = rest
            .strip_prefix(FRAME_DELIMITER)
            .unwrap_or_default()
            .to_string();

        Frames::new(complete.to_string())
    }

    /// Text received after the last delimiter.
    pub fn pending(&self) -> &str {
        &self.carry
    }

    /// End of stream. An unterminated trailing fragment is not a frame and is
    /// handed back only so the caller can report it.
    pub fn finish(self) -> Option<String> {
        if self.carry.is_empty() {
            None
        } else {
            Some(self.carry)
        }
    }
}

/// Lazily yields the frames completed by one [`FrameSplitter::push`].
#[derive(Debug)]
pub struct Frames {
    complete: Option<String>,
    cursor: usize,
}

impl Frames {
    fn new(complete: String) -> Self {
        Self {
            complete: Some(complete),
            cursor: 0,
        }
    }

    fn empty() -> Self {
        Self {
            complete: None,
            cursor: 0,
        }
    }
}

impl Iterator for Frames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let remaining = self.complete.as_deref()?.get(self.cursor..)?;
        if let Some((frame, _)) = remaining.split_once(FRAME_DELIMITER) {
            let frame = frame.to_string();
            self.cursor += frame.len() + FRAME_DELIMITER.len();
            Some(frame)
        } else {
            let frame = remaining.to_string();
            self.complete = None;
            Some(frame)
        }
    }
}
