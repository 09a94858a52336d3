//! Stream engine — the lifecycle state machine for one utterance.
//!
//! ```text
//!   Idle → Buffering → Playing ⇄ Paused
//!                         │  ▲
//!                         ▼  │
//!                        Seeking
//!   (Playing | Buffering) → Draining → Finished → Idle
//! ```
//!
//! The engine owns every piece of mutable stream state (normalizer carry,
//! accumulated audio, outstanding buffers, clock, phase). It is not
//! thread-safe on purpose: exactly one task drives it, see
//! [`PlaybackService`](crate::service::PlaybackService).
//!
//! `Finished` is entered only when the network stream has closed **and**
//! every submitted buffer of the current generation has completed, in
//! whichever order those two facts arrive.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::buffer::AccumulationBuffer;
use crate::clock::{ClockReading, ClockTracker};
use crate::config::PlaybackConfig;
use crate::duration::{DisplayedDuration, DurationEstimator};
use crate::error::PlaybackError;
use crate::format::{self, BYTES_PER_SAMPLE};
use crate::normalizer::ChunkNormalizer;
use crate::scheduler::PlaybackScheduler;
use crate::sink::{AudioSink, BufferHandle};

/// Status text shown when pause/seek is requested with nothing buffered.
pub const NOTHING_TO_PLAY: &str = "Nothing to play";

// ── Phase ──────────────────────────────────────────────────────────

/// Lifecycle phase of the current stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Phase {
    /// No stream prepared.
    #[default]
    Idle,

    /// Stream open, collecting pre-roll before the sink starts.
    Buffering,

    /// Sink rendering while the network stream is open.
    Playing,

    /// Rendering held by the user.
    Paused,

    /// Transient: sink queue being replaced during a seek.
    Seeking,

    /// Network stream closed, remaining buffers still rendering.
    Draining,

    /// Every byte has been rendered. Audio is kept for replay/export.
    Finished,
}

impl Phase {
    /// Whether the sink is rendering and the clock should be sampled.
    pub const fn is_rendering(self) -> bool {
        matches!(self, Self::Playing | Self::Draining)
    }

    /// Whether inbound chunks are accepted in this phase.
    const fn accepts_chunks(self) -> bool {
        matches!(self, Self::Buffering | Self::Playing | Self::Paused | Self::Draining)
    }
}

// ── Events & snapshots ─────────────────────────────────────────────

/// Events emitted by the engine to interested collaborators (UI, ducking).
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Phase changed.
    PhaseChanged(Phase),

    /// Playback reached the end of a closed stream.
    Finished,

    /// User-visible status message set (`Some`) or cleared (`None`).
    Status(Option<String>),
}

/// Observable state, published at the sampling interval.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub phase: Phase,
    /// `current_time / duration`, clamped to `[0, 1]`.
    pub progress: f64,
    pub current_time: Duration,
    /// Displayed duration: `max(estimate, measured)`, never decreasing.
    pub duration: Duration,
    /// Buffers submitted but not yet completed.
    pub scheduled: usize,
    pub buffered_bytes: usize,
    pub dragging: bool,
    pub status: Option<String>,
}

// ── Engine ─────────────────────────────────────────────────────────

/// The streaming playback engine for one utterance at a time.
pub struct StreamEngine<S> {
    config: PlaybackConfig,
    estimator: DurationEstimator,
    normalizer: ChunkNormalizer,
    buffer: AccumulationBuffer,
    scheduler: PlaybackScheduler<S>,
    clock: ClockTracker,
    duration: DisplayedDuration,
    phase: Phase,

    /// True between `prepare_for_stream` and `finish_stream`.
    network_open: bool,

    volume: f32,
    status: Option<String>,
    event_tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl<S: AudioSink> StreamEngine<S> {
    /// Create an idle engine around `sink`.
    ///
    /// Returns the engine and a receiver for [`PlaybackEvent`]s.
    pub fn new(sink: S, config: PlaybackConfig) -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let engine = Self {
            estimator: DurationEstimator::new(config.chars_per_second),
            normalizer: ChunkNormalizer::new(),
            buffer: AccumulationBuffer::new(),
            scheduler: PlaybackScheduler::new(sink, config.pre_roll_bytes()),
            clock: ClockTracker::new(),
            duration: DisplayedDuration::default(),
            phase: Phase::Idle,
            network_open: false,
            volume: config.volume,
            status: None,
            event_tx,
            config,
        };
        (engine, event_rx)
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Reset everything and open a new stream for `text_len` characters
    /// spoken at `speed`.
    pub fn prepare_for_stream(&mut self, text_len: usize, speed: f64) {
        self.reset_stream();
        let estimate = self.estimator.estimate(text_len, speed);
        self.duration = DisplayedDuration::with_estimate(estimate);
        self.network_open = true;
        tracing::info!(text_len, speed, estimate_secs = estimate.as_secs_f64(), "Stream prepared");
        self.set_phase(Phase::Buffering);
    }

    /// Route one inbound chunk (possibly empty) through normalization,
    /// accumulation and scheduling.
    pub fn push_chunk(&mut self, raw: &[u8]) {
        if !self.phase.accepts_chunks() || !self.network_open {
            tracing::debug!(phase = ?self.phase, bytes = raw.len(), "Chunk ignored: no open stream");
            return;
        }

        let run = self.normalizer.normalize(raw);
        if run.is_empty() {
            return;
        }

        self.buffer.append(&run);
        self.duration.update(self.buffer.measured_duration());
        self.scheduler.submit(&run, self.volume);

        if self.phase == Phase::Buffering && self.scheduler.pre_roll_reached() {
            tracing::debug!(buffered = self.buffer.len(), "Pre-roll reached");
            self.begin_rendering(Phase::Playing);
        }
    }

    /// The network stream signalled end of data.
    pub fn finish_stream(&mut self) {
        if !self.network_open {
            return;
        }
        self.network_open = false;

        if let Some(byte) = self.normalizer.discard_leftover() {
            tracing::debug!(byte, "Dropping trailing odd byte at end of stream");
        }
        tracing::info!(
            bytes = self.buffer.len(),
            scheduled = self.scheduler.scheduled_count(),
            "Network stream closed"
        );

        let drained = self.scheduler.scheduled_count() == 0;
        match self.phase {
            Phase::Buffering | Phase::Playing | Phase::Paused if drained => self.finish_playback(),
            Phase::Buffering => self.begin_rendering(Phase::Draining),
            Phase::Playing => self.set_phase(Phase::Draining),
            _ => {}
        }
    }

    /// A buffer finished rendering on the sink.
    ///
    /// Completions from a superseded generation (before the latest stop or
    /// seek) are ignored.
    pub fn on_buffer_completed(&mut self, handle: BufferHandle) {
        if !self.scheduler.complete(handle) {
            return;
        }
        if self.should_finish() {
            self.finish_playback();
        }
    }

    /// Stop playback and discard the stream entirely.
    pub fn stop(&mut self) {
        self.reset_stream();
        self.set_phase(Phase::Idle);
        tracing::info!("Playback stopped");
    }

    // ── User controls ──────────────────────────────────────────────

    /// Pause when rendering, resume when paused, replay when finished.
    ///
    /// Returns the phase after the toggle.
    pub fn toggle_pause(&mut self) -> Result<Phase, PlaybackError> {
        if self.buffer.is_empty() || self.duration.get().is_zero() {
            self.set_status(NOTHING_TO_PLAY);
            return Err(PlaybackError::NothingToPlay);
        }

        match self.phase {
            Phase::Buffering | Phase::Playing | Phase::Draining => {
                self.scheduler.pause();
                self.clock.pause(self.scheduler.render_position());
                self.set_phase(Phase::Paused);
            }
            Phase::Paused => self.resume(),
            Phase::Finished => self.seek(0.0)?,
            Phase::Idle | Phase::Seeking => {}
        }
        Ok(self.phase)
    }

    /// Jump to `fraction` of the displayed duration.
    pub fn seek(&mut self, fraction: f64) -> Result<(), PlaybackError> {
        if self.buffer.is_empty() {
            self.set_status(NOTHING_TO_PLAY);
            return Err(PlaybackError::NothingToPlay);
        }

        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let total = self.duration.get();
        let last_frame = self.buffer.len() - BYTES_PER_SAMPLE;
        let target_byte = format::duration_to_byte_offset(total.mul_f64(fraction)).min(last_frame);
        let position = format::bytes_to_duration(target_byte);

        self.set_phase(Phase::Seeking);
        self.scheduler.cancel();
        let submitted = self.scheduler.submit(self.buffer.slice(target_byte), self.volume);
        self.clock.reanchor(position, self.scheduler.render_position(), total);
        self.scheduler.start();
        self.set_phase(Phase::Playing);

        tracing::info!(
            fraction,
            target_byte,
            position_secs = position.as_secs_f64(),
            "Seeked"
        );

        if submitted.is_none() && self.should_finish() {
            self.finish_playback();
        }
        Ok(())
    }

    /// Set while the user drags the scrubber; suppresses progress updates.
    pub const fn set_dragging(&mut self, dragging: bool) {
        self.clock.set_dragging(dragging);
    }

    /// Change output volume for queued and future buffers.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.scheduler.set_volume(self.volume);
    }

    // ── Observation ────────────────────────────────────────────────

    /// Sample the render clock. Only advances while rendering.
    pub fn tick(&mut self) -> ClockReading {
        if self.phase.is_rendering() {
            self.clock
                .sample(self.scheduler.render_position(), self.duration.get())
        } else {
            self.clock.published()
        }
    }

    /// Current observable state (does not sample the clock).
    pub fn snapshot(&self) -> PlaybackSnapshot {
        let reading = self.clock.published();
        PlaybackSnapshot {
            phase: self.phase,
            progress: reading.progress,
            current_time: reading.current_time,
            duration: self.duration.get(),
            scheduled: self.scheduler.scheduled_count(),
            buffered_bytes: self.buffer.len(),
            dragging: self.clock.is_dragging(),
            status: self.status.clone(),
        }
    }

    /// Standalone WAV (header + every accumulated byte) for saving.
    pub fn export_snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(format::WAV_HEADER_LEN + self.buffer.len());
        out.extend_from_slice(&format::wav_header(self.buffer.len()));
        out.extend_from_slice(self.buffer.as_bytes());
        out
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduler.scheduled_count()
    }

    pub const fn displayed_duration(&self) -> Duration {
        self.duration.get()
    }

    pub fn measured_duration(&self) -> Duration {
        self.buffer.measured_duration()
    }

    pub const fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Remove the transient status message.
    pub fn clear_status(&mut self) {
        if self.status.take().is_some() {
            self.emit(PlaybackEvent::Status(None));
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn resume(&mut self) {
        self.scheduler.start();
        self.clock.resume(self.scheduler.render_position());
        // A completion that raced with the pause may have drained the queue.
        if self.should_finish_from(Phase::Draining) {
            self.finish_playback();
            return;
        }
        let next = if self.network_open { Phase::Playing } else { Phase::Draining };
        self.set_phase(next);
    }

    fn begin_rendering(&mut self, next: Phase) {
        self.scheduler.start();
        self.clock.start(self.scheduler.render_position());
        self.set_phase(next);
    }

    fn should_finish(&self) -> bool {
        self.should_finish_from(self.phase)
    }

    fn should_finish_from(&self, phase: Phase) -> bool {
        phase.is_rendering() && !self.network_open && self.scheduler.scheduled_count() == 0
    }

    fn finish_playback(&mut self) {
        self.scheduler.cancel();
        self.clock.reset();
        tracing::info!(
            duration_secs = self.buffer.measured_duration().as_secs_f64(),
            "Playback finished"
        );
        self.set_phase(Phase::Finished);
        self.emit(PlaybackEvent::Finished);
    }

    fn reset_stream(&mut self) {
        self.scheduler.cancel();
        self.buffer.clear();
        self.normalizer.reset();
        self.clock.reset();
        self.duration = DisplayedDuration::default();
        self.network_open = false;
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase == phase {
            return;
        }
        tracing::debug!(from = ?self.phase, to = ?phase, "Phase transition");
        self.phase = phase;
        self.emit(PlaybackEvent::PhaseChanged(phase));
    }

    fn set_status(&mut self, message: &str) {
        tracing::info!(message, "Status");
        self.status = Some(message.to_string());
        self.emit(PlaybackEvent::Status(self.status.clone()));
    }

    fn emit(&self, event: PlaybackEvent) {
        // Receiver dropped is fine: nobody is listening.
        let _ = self.event_tx.send(event);
    }
}
