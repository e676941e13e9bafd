//! Reassembly of JSON values from an unframed byte stream.
//!
//! The node writes each reply as a bare JSON object with no length prefix or
//! delimiter, and a single read may return any prefix of it. The buffer is
//! re-parsed after every read; a parse failure only means the value has not
//! fully arrived yet.

use serde_json::Value;

use crate::RpcError;

/// Upper bound on buffered bytes before the stream is considered corrupt.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

/// Outcome of a decode attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A whole JSON value, removed from the buffer.
    Complete(Value),
    /// More bytes are needed.
    Incomplete,
}

/// Accumulates raw reads until a JSON value can be decoded.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), RpcError> {
        let size = self.buf.len() + bytes.len();
        if size > MAX_FRAME_SIZE {
            return Err(RpcError::FrameTooLarge {
                size,
                max: MAX_FRAME_SIZE,
            });
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Try to take the first complete JSON value off the front of the buffer.
    ///
    /// Bytes after the value (a trailing newline, or the start of a later
    /// reply) stay buffered for the next call.
    pub fn decode(&mut self) -> Frame {
        let mut stream = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                let consumed = stream.byte_offset();
                self.buf.drain(..consumed);
                self.skip_whitespace();
                Frame::Complete(value)
            }
            Some(Err(_)) | None => Frame::Incomplete,
        }
    }

    /// Current buffer contents, lossily decoded, for diagnostics.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn skip_whitespace(&mut self) {
        let leading = self
            .buf
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.buf.drain(..leading);
    }
}
