//! Growing store of every normalized sample received for the current stream.

use std::time::Duration;

use crate::format::{self, BYTES_PER_SAMPLE};

/// Append-only PCM store; the source of truth for duration, seek and export.
#[derive(Debug, Default)]
pub struct AccumulationBuffer {
    bytes: Vec<u8>,
}

impl AccumulationBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame-aligned run.
    pub fn append(&mut self, run: &[u8]) {
        debug_assert_eq!(run.len() % BYTES_PER_SAMPLE, 0, "unaligned run appended");
        self.bytes.extend_from_slice(run);
    }

    /// Bytes from `from` to the end (empty if `from` is past the end).
    pub fn slice(&self, from: usize) -> &[u8] {
        self.bytes.get(from..).unwrap_or_default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Audio duration of everything accumulated so far.
    pub fn measured_duration(&self) -> Duration {
        format::bytes_to_duration(self.bytes.len())
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_slice() {
        let mut buf = AccumulationBuffer::new();
        buf.append(&[1, 2, 3, 4]);
        buf.append(&[5, 6]);
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.slice(2), &[3u8, 4, 5, 6][..]);
        assert!(buf.slice(6).is_empty());
        assert!(buf.slice(100).is_empty());
    }

    #[test]
    fn measured_duration_tracks_length() {
        let mut buf = AccumulationBuffer::new();
        buf.append(&vec![0; 48_000]);
        assert_eq!(buf.measured_duration(), Duration::from_secs(1));
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.measured_duration(), Duration::ZERO);
    }
}
