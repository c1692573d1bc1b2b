//! Line framing for the raw ingestion protocol
//!
//! Producers terminate each message with `\n` (usually `\r\n`). Bytes are
//! buffered until a terminator arrives; every frame is decoded lossily and
//! trimmed. The buffer is bounded so a peer that never sends a terminator
//! cannot grow it without limit.

/// Default upper bound for one unterminated frame
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    LineTooLong { limit: usize },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::LineTooLong { limit } => {
                write!(f, "line exceeds {} bytes without a terminator", limit)
            }
        }
    }
}

impl std::error::Error for FrameError {}

pub struct LineFramer {
    buf: Vec<u8>,
    max_line_bytes: usize,
}

impl LineFramer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_bytes,
        }
    }

    /// Feed received bytes, returning every message completed by them.
    /// Messages that are empty after trimming are dropped here.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, FrameError> {
        self.buf.extend_from_slice(bytes);

        let mut messages = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let frame: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(message) = decode(&frame) {
                messages.push(message);
            }
        }

        if self.buf.len() > self.max_line_bytes {
            self.buf.clear();
            return Err(FrameError::LineTooLong {
                limit: self.max_line_bytes,
            });
        }

        Ok(messages)
    }

    /// Remaining unterminated bytes at end of stream, if they hold a message
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        decode(&rest)
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

fn decode(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
