//! `AudioSink` abstraction over the audio output device.
//!
//! The engine never talks to a device directly. It submits sample buffers
//! to an [`AudioSink`] and reads the sink's render clock; completion of
//! each buffer is reported back asynchronously through the
//! [`CompletionSender`] handed to the sink at construction.
//!
//! | Implementor | Where used |
//! |---|---|
//! | [`LocalOutput`](crate::audio_thread::LocalOutput) | Speakers via rodio (feature `local-output`) |
//! | [`ManualSink`](crate::testing::ManualSink) | Tests, with a hand-driven render clock (feature `test-utils`) |

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::PlaybackError;

/// Identity of one submitted buffer.
///
/// The generation is bumped every time the sink queue is flushed (stop,
/// seek), so completions for buffers from an older generation can be
/// recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    pub generation: u64,
    pub sequence: u64,
}

/// Abstraction over an audio output sink.
///
/// Buffers are rendered gaplessly in submission order. Methods take
/// `&mut self`: the sink is owned by the single engine task.
#[cfg_attr(test, mockall::automock)]
pub trait AudioSink: Send {
    /// Queue `frames` after everything already submitted.
    ///
    /// The sink must eventually report `handle` through its
    /// [`CompletionSender`] once the buffer has finished rendering, unless
    /// the queue is flushed by [`stop`](AudioSink::stop) first.
    fn submit(&mut self, frames: Vec<i16>, volume: f32, handle: BufferHandle) -> Result<(), PlaybackError>;

    /// Start (or continue) rendering queued buffers.
    fn start(&mut self);

    /// Hold rendering; queued buffers are kept.
    fn pause(&mut self);

    /// Drop every queued buffer. Pending completions need not be reported.
    fn stop(&mut self);

    /// Change output volume (0.0 = muted, 1.0 = full) of queued audio.
    fn set_volume(&mut self, volume: f32);

    /// Total audio rendered by the device so far.
    ///
    /// Monotonic for the lifetime of the sink; only advances while frames
    /// are actually pulled by the output.
    fn render_position(&self) -> Duration;
}

/// Channel end a sink uses to report finished buffers to the engine task.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<BufferHandle>,
}

impl CompletionSender {
    /// Create a completion channel pair.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BufferHandle>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report that `handle` finished rendering.
    ///
    /// Safe to call from any thread, including the audio render callback.
    pub fn notify(&self, handle: BufferHandle) {
        if self.tx.send(handle).is_err() {
            tracing::trace!(?handle, "Completion dropped: engine task gone");
        }
    }
}
