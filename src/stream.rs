//! Response stream decoding
//!
//! Turns decoded text chunks into protocol frames. The splitter only knows
//! about frame boundaries; what a frame means is decided by [`Frame::parse`].

mod frame;
mod splitter;


pub use frame::{Frame, FrameParseError, END_MARKER};
pub use splitter::FrameSplitter;
