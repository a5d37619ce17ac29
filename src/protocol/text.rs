//! `grpc-web-text` body encoding.
//!
//! The framed byte stream travels as base64. Servers may flush several
//! independently padded base64 segments back to back, and the transport may
//! split quanta anywhere, so decoding is done per 4-character quantum run
//! with any partial quantum kept for the next chunk.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{GrpcWebError, Result};

/// Base64-encode framed bytes for a text-mode request body.
pub fn encode_text(framed: &[u8]) -> String {
    STANDARD.encode(framed)
}

/// Incremental base64 decoder for text-mode response bodies.
#[derive(Debug, Default)]
pub struct TextDecoder {
    pending: Vec<u8>,
}

impl TextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed base64 text and return every byte decodable so far.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        self.pending
            .extend(chunk.iter().copied().filter(|b| !b.is_ascii_whitespace()));

        let usable = self.pending.len() / 4 * 4;
        let mut decoded = Vec::with_capacity(usable / 4 * 3);
        let mut start = 0;
        for end in (4..=usable).step_by(4) {
            // A padded quantum closes a segment; decode each segment on its own.
            if self.pending[end - 1] == b'=' || end == usable {
                STANDARD
                    .decode_vec(&self.pending[start..end], &mut decoded)
                    .map_err(|e| GrpcWebError::framing(format!("invalid base64 body: {e}")))?;
                start = end;
            }
        }
        self.pending.drain(..usable);
        Ok(decoded)
    }

    /// Fail if a partial base64 quantum is left over at end of stream.
    pub fn finish(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(GrpcWebError::framing(format!(
                "text body ended inside a base64 quantum ({} characters left)",
                self.pending.len()
            )))
        }
    }
}
