//! Header stripping and sample alignment for inbound chunks.
//!
//! Network chunk boundaries are arbitrary: the 44-byte header may arrive
//! split over several chunks and a chunk may end in the middle of a sample.
//! [`ChunkNormalizer`] hides both so that everything downstream only ever
//! sees whole 16-bit frames.

use crate::format::{BYTES_PER_SAMPLE, WAV_HEADER_LEN};

/// Stateful chunk normalizer for one stream.
#[derive(Debug, Default)]
pub struct ChunkNormalizer {
    /// Header bytes collected so far (cleared once the header is complete).
    pending_header: Vec<u8>,

    /// Set once the header has been stripped; never cleared until `reset`.
    header_consumed: bool,

    /// Odd trailing byte carried into the next chunk.
    leftover: Option<u8>,
}

impl ChunkNormalizer {
    /// Create a normalizer awaiting a fresh header.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one raw chunk into a frame-aligned payload (possibly empty).
    pub fn normalize(&mut self, raw: &[u8]) -> Vec<u8> {
        if self.header_consumed {
            return self.align(raw);
        }

        self.pending_header.extend_from_slice(raw);
        if self.pending_header.len() < WAV_HEADER_LEN {
            tracing::trace!(
                collected = self.pending_header.len(),
                "Waiting for remainder of stream header"
            );
            return Vec::new();
        }

        let pending = std::mem::take(&mut self.pending_header);
        self.header_consumed = true;
        tracing::debug!(excess = pending.len() - WAV_HEADER_LEN, "Stream header stripped");
        self.align(&pending[WAV_HEADER_LEN..])
    }

    fn align(&mut self, raw: &[u8]) -> Vec<u8> {
        let mut joined = Vec::with_capacity(raw.len() + 1);
        if let Some(byte) = self.leftover.take() {
            joined.push(byte);
        }
        joined.extend_from_slice(raw);

        let usable = (joined.len() / BYTES_PER_SAMPLE) * BYTES_PER_SAMPLE;
        if usable < joined.len() {
            self.leftover = Some(joined[usable]);
            joined.truncate(usable);
        }
        joined
    }

    /// Whether the header has been stripped for this stream.
    pub const fn header_consumed(&self) -> bool {
        self.header_consumed
    }

    /// The carried odd byte, if any.
    pub const fn leftover(&self) -> Option<u8> {
        self.leftover
    }

    /// Drop the carried byte at end of stream. It can never form a frame.
    pub fn discard_leftover(&mut self) -> Option<u8> {
        self.leftover.take()
    }

    /// Forget all carry state; the next chunk is expected to start with a header.
    pub fn reset(&mut self) {
        self.pending_header.clear();
        self.header_consumed = false;
        self.leftover = None;
    }
}
