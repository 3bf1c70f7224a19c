//! # Coordinator Framing
//!
//! Each message on the coordinator socket is one compact JSON envelope
//! followed by the two-byte terminator `#C`. The decoder also accepts a
//! complete JSON object that arrives without a terminator, since some
//! coordinator builds omit it on short responses.

use shared_types::{Envelope, WireError};

pub const FRAME_TERMINATOR: &[u8] = b"#C";

/// Serialize an envelope with its terminator.
pub fn encode_frame(envelope: &Envelope) -> Result<Vec<u8>, WireError> {
    let mut frame = envelope.to_vec()?;
    frame.extend_from_slice(FRAME_TERMINATOR);
    Ok(frame)
}

#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_frame: usize,
}

impl FrameDecoder {
    pub fn new(max_frame: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame,
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Append `bytes` and return every frame they complete, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<Envelope, WireError>> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while let Some(end) = find_terminator(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + FRAME_TERMINATOR.len()).collect();
            let body = trim_ascii(&frame[..end]);
            if !body.is_empty() {
                frames.push(Envelope::from_slice(body));
            }
        }

        let rest = trim_ascii(&self.buffer);
        if rest.is_empty() {
            self.buffer.clear();
        } else if rest.first() == Some(&b'{') && serde_json::from_slice::<serde_json::Value>(rest).is_ok() {
            frames.push(Envelope::from_slice(rest));
            self.buffer.clear();
        } else if self.buffer.len() > self.max_frame {
            self.buffer.clear();
            frames.push(Err(WireError::FrameTooLarge {
                limit: self.max_frame,
            }));
        }
        frames
    }
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_TERMINATOR.len())
        .position(|window| window == FRAME_TERMINATOR)
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}
