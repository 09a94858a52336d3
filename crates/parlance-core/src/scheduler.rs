//! Buffer scheduling onto the audio sink.
//!
//! The scheduler converts aligned byte runs to samples, hands them to the
//! sink in FIFO order and keeps the set of buffers whose completion has not
//! been observed yet. Handles are tagged with a generation that changes on
//! every flush, which is what makes late completions from a cancelled queue
//! harmless.

use std::collections::HashSet;
use std::time::Duration;

use crate::format;
use crate::sink::{AudioSink, BufferHandle};

/// Submits buffers and tracks outstanding completions.
pub struct PlaybackScheduler<S> {
    sink: S,

    /// Current generation; bumped by [`cancel`](Self::cancel).
    generation: u64,

    /// Sequence number for the next submission.
    next_sequence: u64,

    /// Sequences of the current generation still rendering.
    outstanding: HashSet<u64>,

    /// Bytes submitted since the queue was last flushed (for pre-roll).
    queued_bytes: usize,

    /// Bytes that must be queued before playback may start.
    pre_roll_bytes: usize,
}

impl<S: AudioSink> PlaybackScheduler<S> {
    pub fn new(sink: S, pre_roll_bytes: usize) -> Self {
        Self {
            sink,
            generation: 0,
            next_sequence: 0,
            outstanding: HashSet::new(),
            queued_bytes: 0,
            pre_roll_bytes,
        }
    }

    /// Submit one aligned run. Returns `None` if the run was dropped.
    ///
    /// Zero-length runs and runs the sink rejects are dropped silently:
    /// alignment is already guaranteed upstream, so nothing partial is lost.
    pub fn submit(&mut self, run: &[u8], volume: f32) -> Option<BufferHandle> {
        let frames = format::bytes_to_samples(run);
        if frames.is_empty() {
            return None;
        }

        let handle = BufferHandle {
            generation: self.generation,
            sequence: self.next_sequence,
        };

        if let Err(e) = self.sink.submit(frames, volume, handle) {
            tracing::debug!(error = %e, bytes = run.len(), "Sink rejected buffer — dropped");
            return None;
        }

        self.next_sequence += 1;
        self.outstanding.insert(handle.sequence);
        self.queued_bytes += run.len();
        tracing::trace!(?handle, bytes = run.len(), scheduled = self.outstanding.len(), "Buffer scheduled");
        Some(handle)
    }

    /// Record a completion. Returns `false` for stale or duplicate handles.
    pub fn complete(&mut self, handle: BufferHandle) -> bool {
        if handle.generation != self.generation {
            tracing::debug!(
                ?handle,
                current = self.generation,
                "Ignoring completion from superseded generation"
            );
            return false;
        }
        if !self.outstanding.remove(&handle.sequence) {
            tracing::debug!(?handle, "Ignoring completion for unknown buffer");
            return false;
        }
        true
    }

    /// Flush the sink queue and invalidate every outstanding handle.
    pub fn cancel(&mut self) {
        self.sink.stop();
        self.generation += 1;
        self.next_sequence = 0;
        self.outstanding.clear();
        self.queued_bytes = 0;
    }

    /// Whether enough audio has been queued to start without stuttering.
    pub const fn pre_roll_reached(&self) -> bool {
        self.queued_bytes >= self.pre_roll_bytes
    }

    pub fn start(&mut self) {
        self.sink.start();
    }

    pub fn pause(&mut self) {
        self.sink.pause();
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }

    pub fn scheduled_count(&self) -> usize {
        self.outstanding.len()
    }

    pub fn render_position(&self) -> Duration {
        self.sink.render_position()
    }
}
