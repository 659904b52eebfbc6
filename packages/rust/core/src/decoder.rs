//! Streaming response decoder.
//!
//! Reassembles a chunked response body into one string. UTF-8 sequences
//! split across chunk boundaries are carried over to the next chunk.

use futures::StreamExt;
use tracing::debug;

use glimpse_shared::{GlimpseError, Result};

use crate::provider::ServiceResponse;

/// Incremental UTF-8 decoder with carry-over between chunks.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    carry: Vec<u8>,
    text: String,
    consumed: usize,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk. An incomplete trailing sequence is kept for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        self.carry.extend_from_slice(chunk);

        let valid = match std::str::from_utf8(&self.carry) {
            Ok(text) => {
                self.text.push_str(text);
                self.carry.len()
            }
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let text = std::str::from_utf8(&self.carry[..valid])
                    .map_err(|e| GlimpseError::Decode(e.to_string()))?;
                self.text.push_str(text);
                valid
            }
            Err(e) => {
                return Err(GlimpseError::Decode(format!(
                    "invalid UTF-8 at byte {}",
                    self.consumed + e.valid_up_to()
                )));
            }
        };

        self.carry.drain(..valid);
        self.consumed += valid;
        Ok(())
    }

    /// Flush at end-of-stream. A dangling partial sequence is an error.
    pub fn finish(self) -> Result<String> {
        if !self.carry.is_empty() {
            return Err(GlimpseError::Decode(format!(
                "stream ended inside a UTF-8 sequence ({} dangling bytes)",
                self.carry.len()
            )));
        }
        Ok(self.text)
    }
}

/// Consume a service response into its full text.
///
/// The status is checked before the body is read; a non-success status is
/// a transport error and no chunk is pulled.
pub async fn decode(response: ServiceResponse) -> Result<String> {
    let ServiceResponse { status, mut body } = response;
    if !status.is_success() {
        return Err(GlimpseError::Transport(format!("HTTP {status}")));
    }

    let mut decoder = Utf8StreamDecoder::new();
    let mut chunks = 0usize;
    while let Some(chunk) = body.next().await {
        decoder.push(&chunk?)?;
        chunks += 1;
    }

    let text = decoder.finish()?;
    debug!(chunks, bytes = text.len(), "decoded response body");
    Ok(text)
}
